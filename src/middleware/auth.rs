// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::Session,
};

/// Cookie onde o SDK do provedor guarda o token de sessão no frontend.
pub const SESSION_COOKIE: &str = "__session";

fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

// O middleware em si. Roda em todas as rotas: sem token (ou token inválido) a
// requisição segue anônima, e os extratores abaixo decidem se isso basta.
pub async fn session_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match app_state.auth_service.validate_token(&token) {
            Ok(session) => {
                tracing::debug!(user_id = %session.user_id, org_id = ?session.org_id, "Session verified");
                request.extensions_mut().insert(session);
            }
            Err(e) => tracing::debug!("Ignoring session token: {}", e),
        }
    }

    next.run(request).await
}

/// Extrator para handlers que exigem usuário autenticado.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Session);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(AuthenticatedUser(session.clone()));
        }

        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        Err(AppError::Unauthenticated.to_api_error(&locale, &app_state.i18n_store))
    }
}

/// A sessão, se houver. Nunca rejeita.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Session>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        headers.insert(header::COOKIE, "__session=from-cookie".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; __session=tok".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn no_credentials_means_no_token() {
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
