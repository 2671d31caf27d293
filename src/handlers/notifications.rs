// src/handlers/notifications.rs

//! Notifications belong to a user, not just an organization: every query is
//! keyed by the caller's mirrored user id as well.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{get_rls_connection, RlsTransaction},
        error::{ApiError, AppError},
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{NotificationRepository, OrganizationRepository},
    middleware::{
        auth::{AuthenticatedUser, MaybeUser},
        i18n::Locale,
        tenancy::{OrgScope, TenantContext},
    },
    models::notification::{Notification, UnreadCount},
};

async fn caller_id(tx: &mut RlsTransaction, user: &AuthenticatedUser) -> Result<Uuid, AppError> {
    OrganizationRepository
        .find_user_id(&mut **tx, &user.0.user_id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound("user".into()))
}

async fn open(
    app_state: &AppState,
    tenant: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<(RlsTransaction, Uuid), AppError> {
    let mut tx = get_rls_connection(app_state, tenant, user).await?;
    let user_id = caller_id(&mut tx, user).await?;
    Ok((tx, user_id))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    responses((status = 200, description = "The caller's latest notifications", body = ListResponse<Notification>)),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    MaybeUser(session): MaybeUser,
    OrgScope(scope): OrgScope,
) -> ListResponse<Notification> {
    let (Some(tenant), Some(session)) = (scope.tenant(), session) else {
        return ListResponse::unresolved(&scope);
    };
    let user = AuthenticatedUser(session);

    let result = async {
        let (mut tx, user_id) = open(&app_state, &tenant, &user).await?;
        NotificationRepository.list_for_user(&mut *tx, tenant.0, user_id).await
    }
    .await;

    ListResponse::from_result(result, "notifications")
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses((status = 200, description = "Number of unread notifications", body = UnreadCount)),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (mut tx, user_id) = open(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let count = NotificationRepository
        .unread_count(&mut *tx, tenant.0, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(UnreadCount { count }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 404, description = "No such notification for the caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (mut tx, user_id) = open(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = NotificationRepository
        .mark_read(&mut *tx, tenant.0, user_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    if !updated {
        return Err(AppError::ResourceNotFound("notification".into()).to_api_error(&locale, &app_state.i18n_store));
    }

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::NOTIFICATIONS))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "All of the caller's notifications marked as read")),
    security(("api_jwt" = []))
)]
pub async fn mark_all_notifications_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (mut tx, user_id) = open(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = NotificationRepository
        .mark_all_read(&mut *tx, tenant.0, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(json!({ "updated": updated })).revalidate(views::NOTIFICATIONS))
}
