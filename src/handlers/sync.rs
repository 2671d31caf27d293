// src/handlers/sync.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    /// Users upserted into the mirror
    pub synced: usize,
    pub skipped: usize,
    pub memberships: usize,
}

#[utoipa::path(
    get,
    path = "/api/sync-users",
    tag = "Identity",
    responses(
        (status = 200, description = "Users (and the active organization's memberships) copied into the mirror", body = SyncResult),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Provider not configured or unreachable")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_users(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let provider = app_state
        .identity_provider
        .as_ref()
        .ok_or_else(|| AppError::IdentityProviderNotConfigured.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(user_id = %session.user_id, org_id = ?session.org_id, "Manual user sync requested");

    let report = provider
        .sync(app_state.identity_sync.as_ref(), session.org_id.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(SyncResult {
        success: true,
        message: app_state.i18n_store.translate(&locale.0, "messages.users_synced"),
        synced: report.users,
        skipped: report.skipped,
        memberships: report.memberships,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/sync-users", get(sync_users))
            .with_state(AppState::for_tests())
    }

    #[tokio::test]
    async fn anonymous_callers_get_the_failure_shape() {
        let request = Request::builder().uri("/api/sync-users").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "You must be signed in to do this.");
    }
}
