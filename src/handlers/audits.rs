// src/handlers/audits.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        filters::AuditFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{AuditRepository, OrganizationRepository},
    handlers::ValidatedJson,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
        tenancy::OrgScope,
    },
    models::audit::{Audit, AuditChanges, AuditDetail, AuditListRow, AuditStatus, NewAudit, ResultInput},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditPayload {
    pub location_id: Uuid,
    pub template_id: Uuid,
    /// Defaults to today
    pub audit_date: Option<NaiveDate>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditPayload {
    pub status: Option<AuditStatus>,
    pub audit_date: Option<NaiveDate>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAuditPayload {
    #[validate(length(min = 1))]
    pub results: Vec<ResultInput>,
}

#[utoipa::path(
    get,
    path = "/api/audits",
    tag = "Audits",
    params(AuditFilters),
    responses((status = 200, description = "Audits of the active organization, newest first", body = ListResponse<AuditListRow>)),
    security(("api_jwt" = []))
)]
pub async fn list_audits(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<AuditFilters>,
) -> ListResponse<AuditListRow> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        AuditRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "audits")
}

#[utoipa::path(
    get,
    path = "/api/audits/{id}",
    tag = "Audits",
    params(("id" = Uuid, Path, description = "Audit id")),
    responses(
        (status = 200, description = "Audit with its results", body = AuditDetail),
        (status = 404, description = "No such audit in this organization")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .audit_service
        .get_detail(&mut *conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(detail))
}

#[utoipa::path(
    post,
    path = "/api/audits",
    tag = "Audits",
    request_body = CreateAuditPayload,
    responses(
        (status = 201, description = "Draft audit created", body = Audit),
        (status = 400, description = "Invalid payload, or a location or template outside the organization"),
        (status = 401, description = "Not signed in")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    ValidatedJson(payload): ValidatedJson<CreateAuditPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let inspector_id = OrganizationRepository
        .find_user_id(&mut *rls_conn, &user.0.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewAudit {
        location_id: payload.location_id,
        template_id: payload.template_id,
        inspector_id,
        audit_date: payload.audit_date.unwrap_or_else(|| Utc::now().date_naive()),
        notes: payload.notes,
    };
    let audit = app_state
        .audit_service
        .create(&mut *rls_conn, tenant.0, &new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(audit_id = %audit.id, "Audit created");
    Ok(ActionResponse::created(audit).revalidate(views::AUDITS))
}

#[utoipa::path(
    patch,
    path = "/api/audits/{id}",
    tag = "Audits",
    params(("id" = Uuid, Path, description = "Audit id")),
    request_body = UpdateAuditPayload,
    responses(
        (status = 200, description = "Audit updated", body = Audit),
        (status = 400, description = "`completed` requested; only /complete may set it"),
        (status = 404, description = "No such audit"),
        (status = 409, description = "Status change on a completed or cancelled audit")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateAuditPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = AuditChanges {
        status: payload.status,
        audit_date: payload.audit_date,
        notes: payload.notes,
    };
    let audit = app_state
        .audit_service
        .update(&mut *rls_conn, tenant.0, id, &changes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(audit).revalidate(views::AUDITS))
}

#[utoipa::path(
    post,
    path = "/api/audits/{id}/complete",
    tag = "Audits",
    params(("id" = Uuid, Path, description = "Audit id")),
    request_body = CompleteAuditPayload,
    responses(
        (status = 200, description = "Results recorded and audit scored", body = Audit),
        (status = 400, description = "Results reference items outside the audit's template"),
        (status = 404, description = "No such audit"),
        (status = 409, description = "Audit already completed or cancelled")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CompleteAuditPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let audit = app_state
        .audit_service
        .complete(&mut *rls_conn, tenant.0, id, &payload.results)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    // a failed audit also raised an alert
    let views = if audit.passed == Some(false) { views::FAILED_AUDITS } else { views::AUDITS };
    Ok(ActionResponse::ok(audit).revalidate(views))
}

#[utoipa::path(
    delete,
    path = "/api/audits/{id}",
    tag = "Audits",
    params(("id" = Uuid, Path, description = "Audit id")),
    responses(
        (status = 200, description = "Audit, results and photos removed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such audit")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let deleted = AuditRepository
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    if !deleted {
        return Err(AppError::ResourceNotFound("audit".into()).to_api_error(&locale, &app_state.i18n_store));
    }

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::AUDITS))
}
