// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::Serialize;
use serde_json::json;
use std::marker::PhantomData;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::{Session, ADMIN_ROLE, MEMBER_ROLE},
};

/// Para onde vai quem não tem o papel exigido.
pub const DEFAULT_FALLBACK: &str = "/dashboard/audits";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub role: String,
}

/// A associação como o chamador a conhece no momento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipLoad {
    Loading,
    Loaded(Option<Membership>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleState {
    pub role: Role,
    pub is_admin: bool,
    pub is_member: bool,
    pub is_loading: bool,
}

impl RoleState {
    pub fn resolve(load: &MembershipLoad) -> Self {
        let membership = match load {
            MembershipLoad::Loading => {
                return RoleState { role: Role::Unknown, is_admin: false, is_member: false, is_loading: true };
            }
            MembershipLoad::Loaded(membership) => membership,
        };

        let role = match membership.as_ref().map(|m| m.role.as_str()) {
            Some(ADMIN_ROLE) => Role::Admin,
            Some(MEMBER_ROLE) => Role::Member,
            _ => Role::Unknown,
        };

        RoleState {
            role,
            is_admin: role == Role::Admin,
            // admin também é sempre membro
            is_member: matches!(role, Role::Admin | Role::Member),
            is_loading: false,
        }
    }

    /// No servidor a associação já está carregada: é o claim de papel da sessão.
    pub fn from_session(session: Option<&Session>) -> Self {
        let membership = session
            .and_then(|s| s.org_role.as_ref())
            .map(|role| Membership { role: role.clone() });
        Self::resolve(&MembershipLoad::Loaded(membership))
    }

    pub fn satisfies(&self, requirement: RoleRequirement) -> bool {
        match requirement {
            RoleRequirement::Admin => self.is_admin,
            RoleRequirement::Member => self.is_member,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Associação ainda carregando: não renderiza nada e não redireciona ninguém.
    Pending,
    Allow,
    Redirect(String),
}

pub fn guard_route(state: &RoleState, requirement: RoleRequirement, fallback: Option<&str>) -> RouteDecision {
    if state.is_loading {
        return RouteDecision::Pending;
    }
    if state.satisfies(requirement) {
        RouteDecision::Allow
    } else {
        RouteDecision::Redirect(fallback.unwrap_or(DEFAULT_FALLBACK).to_string())
    }
}

// ---
// Guardião de rota como extrator
// ---
pub trait RoleRequirementDef: Send + Sync + 'static {
    fn requirement() -> RoleRequirement;
    fn name() -> &'static str;
}

pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirementDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai a sessão
        let session = parts.extensions.get::<Session>().cloned();
        let role_state = RoleState::from_session(session.as_ref());

        // B. Aplica a regra da rota
        let redirect_to = match guard_route(&role_state, T::requirement(), None) {
            RouteDecision::Allow => return Ok(RequireRole(PhantomData)),
            RouteDecision::Redirect(target) => target,
            // no servidor o claim de papel da sessão nunca está pendente
            RouteDecision::Pending => DEFAULT_FALLBACK.to_string(),
        };

        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        // C. Anônimo é 401; autenticado sem papel é 403 com o destino do redirect
        if session.is_none() {
            return Err(AppError::Unauthenticated.to_api_error(&locale, &app_state.i18n_store));
        }

        tracing::debug!("Role '{}' required, caller has {:?}", T::name(), role_state.role);
        let mut api_error = AppError::Forbidden(T::name()).to_api_error(&locale, &app_state.i18n_store);
        if let Some(details) = api_error.details.as_mut() {
            details["redirectTo"] = json!(redirect_to);
        }
        Err(api_error)
    }
}

pub struct AdminOnly;
impl RoleRequirementDef for AdminOnly {
    fn requirement() -> RoleRequirement { RoleRequirement::Admin }
    fn name() -> &'static str { ADMIN_ROLE }
}

pub struct MemberOnly;
impl RoleRequirementDef for MemberOnly {
    fn requirement() -> RoleRequirement { RoleRequirement::Member }
    fn name() -> &'static str { MEMBER_ROLE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{middleware::auth::session_middleware, services::auth::tests::token_for};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn admin_only(_guard: RequireRole<AdminOnly>) -> &'static str {
        "ok"
    }

    async fn call_admin_route(token: Option<String>) -> (StatusCode, Value) {
        let state = AppState::for_tests();
        let app = Router::new()
            .route("/admin", get(admin_only))
            .layer(from_fn_with_state(state.clone(), session_middleware))
            .with_state(state);

        let mut request = Request::builder().uri("/admin");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn extractor_distinguishes_anonymous_from_underprivileged() {
        let (status, _) = call_admin_route(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call_admin_route(Some(token_for(Some("org_1"), Some("org:member")))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["details"]["requiredRole"], "org:admin");
        assert_eq!(body["details"]["redirectTo"], DEFAULT_FALLBACK);

        let (status, _) = call_admin_route(Some(token_for(Some("org_1"), Some("org:admin")))).await;
        assert_eq!(status, StatusCode::OK);
    }

    fn loaded(role: &str) -> MembershipLoad {
        MembershipLoad::Loaded(Some(Membership { role: role.into() }))
    }

    #[test]
    fn admin_is_also_member() {
        let state = RoleState::resolve(&loaded("org:admin"));
        assert_eq!(state.role, Role::Admin);
        assert!(state.is_admin && state.is_member && !state.is_loading);
    }

    #[test]
    fn member_is_not_admin() {
        let state = RoleState::resolve(&loaded("org:member"));
        assert_eq!(state.role, Role::Member);
        assert!(!state.is_admin);
        assert!(state.is_member);
    }

    #[test]
    fn unrecognized_or_absent_roles_get_nothing() {
        for load in [loaded("org:billing"), loaded("admin"), MembershipLoad::Loaded(None)] {
            let state = RoleState::resolve(&load);
            assert_eq!(state.role, Role::Unknown);
            assert!(!state.is_admin && !state.is_member);
        }
    }

    #[test]
    fn loading_grants_nothing_and_defers_the_guard() {
        let state = RoleState::resolve(&MembershipLoad::Loading);
        assert!(state.is_loading && !state.is_admin && !state.is_member);
        assert_eq!(guard_route(&state, RoleRequirement::Member, None), RouteDecision::Pending);
    }

    #[test]
    fn guard_redirects_to_fallback() {
        let member = RoleState::resolve(&loaded("org:member"));
        assert_eq!(guard_route(&member, RoleRequirement::Member, None), RouteDecision::Allow);
        assert_eq!(
            guard_route(&member, RoleRequirement::Admin, None),
            RouteDecision::Redirect("/dashboard/audits".into())
        );
        assert_eq!(
            guard_route(&member, RoleRequirement::Admin, Some("/dashboard")),
            RouteDecision::Redirect("/dashboard".into())
        );
    }

    #[test]
    fn session_role_claim_feeds_the_resolver() {
        let session = Session {
            user_id: "user_1".into(),
            session_id: None,
            org_id: Some("org_1".into()),
            org_role: Some("org:admin".into()),
            org_slug: None,
        };
        assert!(RoleState::from_session(Some(&session)).is_admin);
        assert_eq!(RoleState::from_session(None).role, Role::Unknown);
    }
}
