// src/handlers/alerts.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        filters::AlertFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::AlertRepository,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::OrgScope},
    models::alert::Alert,
};

#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    params(AlertFilters),
    responses((status = 200, description = "Alerts, newest first", body = ListResponse<Alert>)),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<AlertFilters>,
) -> ListResponse<Alert> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        AlertRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "alerts")
}

#[utoipa::path(
    post,
    path = "/api/alerts/{id}/read",
    tag = "Alerts",
    params(("id" = Uuid, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert marked as read", body = Alert),
        (status = 404, description = "No such alert")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_alert_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let alert = AlertRepository
        .mark_read(&mut *rls_conn, tenant.0, id)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("alert".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(alert).revalidate(views::ALERTS))
}

#[utoipa::path(
    delete,
    path = "/api/alerts/{id}",
    tag = "Alerts",
    params(("id" = Uuid, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert dismissed"),
        (status = 404, description = "No such alert")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_alert(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let deleted = AlertRepository
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    if !deleted {
        return Err(AppError::ResourceNotFound("alert".into()).to_api_error(&locale, &app_state.i18n_store));
    }

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::ALERTS))
}
