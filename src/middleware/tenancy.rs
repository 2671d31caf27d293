// src/middleware/tenancy.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::ListStatus},
    config::AppState,
    db::OrganizationRepository,
    models::auth::Session,
};

/// Id interno da organização à qual todas as queries da requisição se limitam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

/// Resultado de mapear a organização ativa da sessão para o espelho.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgResolution {
    Resolved(TenantContext),
    Unauthenticated,
    NoActiveOrganization,
    /// Autenticado com uma organização que o webhook ainda não espelhou.
    NotFound,
    NotConfigured,
    Unavailable,
}

impl OrgResolution {
    /// Escritas e leituras de uma linha precisam de tenant; o resto é erro.
    pub fn require(&self) -> Result<TenantContext, AppError> {
        match self {
            OrgResolution::Resolved(tenant) => Ok(*tenant),
            OrgResolution::Unauthenticated => Err(AppError::Unauthenticated),
            OrgResolution::NoActiveOrganization => Err(AppError::NoActiveOrganization),
            OrgResolution::NotFound => Err(AppError::OrganizationNotFound),
            OrgResolution::NotConfigured => Err(AppError::StoreNotConfigured),
            OrgResolution::Unavailable => Err(AppError::InternalServerError(anyhow::anyhow!(
                "organization lookup failed"
            ))),
        }
    }

    pub fn list_status(&self) -> ListStatus {
        match self {
            OrgResolution::Resolved(_) => ListStatus::Ok,
            OrgResolution::Unauthenticated => ListStatus::Unauthenticated,
            OrgResolution::NoActiveOrganization => ListStatus::NoActiveOrganization,
            OrgResolution::NotFound => ListStatus::OrganizationNotFound,
            OrgResolution::NotConfigured => ListStatus::NotConfigured,
            OrgResolution::Unavailable => ListStatus::Unavailable,
        }
    }

    pub fn tenant(&self) -> Option<TenantContext> {
        match self {
            OrgResolution::Resolved(tenant) => Some(*tenant),
            _ => None,
        }
    }
}

/// Extrator que nunca rejeita: leituras degradam conforme a resolução,
/// escritas chamam `require()`.
#[derive(Debug, Clone)]
pub struct OrgScope(pub OrgResolution);

impl<S> FromRequestParts<S> for OrgScope
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Cache: um handler com OrgScope e RequireRole resolve uma vez só
        if let Some(resolution) = parts.extensions.get::<OrgResolution>() {
            return Ok(OrgScope(resolution.clone()));
        }

        // 2. Resolve a organização ativa da sessão no espelho
        let app_state = AppState::from_ref(state);
        let resolution = resolve(&app_state, parts.extensions.get::<Session>()).await;
        parts.extensions.insert(resolution.clone());
        Ok(OrgScope(resolution))
    }
}

async fn resolve(app_state: &AppState, session: Option<&Session>) -> OrgResolution {
    let Some(session) = session else {
        return OrgResolution::Unauthenticated;
    };
    let Some(external_org_id) = session.org_id.as_deref() else {
        return OrgResolution::NoActiveOrganization;
    };
    let Some(pool) = app_state.db_pool.as_ref() else {
        return OrgResolution::NotConfigured;
    };

    match OrganizationRepository.find_id_by_external_id(pool, external_org_id).await {
        Ok(Some(id)) => OrgResolution::Resolved(TenantContext(id)),
        Ok(None) => {
            tracing::warn!("Organization {} is not mirrored yet", external_org_id);
            OrgResolution::NotFound
        }
        Err(e) => {
            tracing::error!("Failed to resolve organization {}: {}", external_org_id, e);
            OrgResolution::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

    fn session(org: Option<&str>) -> Session {
        Session {
            user_id: "user_1".into(),
            session_id: None,
            org_id: org.map(str::to_string),
            org_role: None,
            org_slug: None,
        }
    }

    #[tokio::test]
    async fn anonymous_requests_are_unauthenticated() {
        let state = AppState::for_tests();
        assert_eq!(resolve(&state, None).await, OrgResolution::Unauthenticated);
    }

    #[tokio::test]
    async fn personal_sessions_have_no_active_organization() {
        let state = AppState::for_tests();
        assert_eq!(resolve(&state, Some(&session(None))).await, OrgResolution::NoActiveOrganization);
    }

    #[tokio::test]
    async fn missing_store_is_reported_as_not_configured() {
        let state = AppState::for_tests();
        let resolution = resolve(&state, Some(&session(Some("org_1")))).await;
        assert_eq!(resolution, OrgResolution::NotConfigured);
        assert_eq!(resolution.list_status(), ListStatus::NotConfigured);
    }

    #[test]
    fn require_maps_each_state_to_its_status() {
        let store = I18nStore::load("en").unwrap();
        let locale = Locale("en".into());
        let status = |r: OrgResolution| r.require().unwrap_err().to_api_error(&locale, &store).status;

        assert_eq!(status(OrgResolution::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status(OrgResolution::NoActiveOrganization), StatusCode::FORBIDDEN);
        assert_eq!(status(OrgResolution::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(OrgResolution::NotConfigured), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(OrgResolution::Unavailable), StatusCode::INTERNAL_SERVER_ERROR);

        let id = Uuid::new_v4();
        assert_eq!(OrgResolution::Resolved(TenantContext(id)).require().unwrap(), TenantContext(id));
    }
}
