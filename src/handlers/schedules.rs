// src/handlers/schedules.rs

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
        filters::ScheduleFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{Reference, ReferenceRepository, ScheduleRepository},
    handlers::ValidatedJson,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, MemberOnly, RequireRole},
        tenancy::OrgScope,
    },
    models::schedule::{NewSchedule, Recurrence, ScheduleChanges, ScheduledAudit, ScheduledAuditRow},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchedulePayload {
    #[validate(length(min = 1, max = 200, message = "validation.required"))]
    pub name: String,
    pub location_id: Uuid,
    pub template_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub recurrence: Recurrence,
    pub next_scheduled_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchedulePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub inspector_id: Option<Uuid>,
    pub recurrence: Option<Recurrence>,
    pub next_scheduled_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleActivePayload {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceSchedulePayload {
    /// Defaults to today
    pub ran_on: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/scheduled-audits",
    tag = "Scheduled audits",
    params(ScheduleFilters),
    responses((status = 200, description = "Schedules by next due date, with recurrence labels", body = ListResponse<ScheduledAuditRow>)),
    security(("api_jwt" = []))
)]
pub async fn list_schedules(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<ScheduleFilters>,
) -> ListResponse<ScheduledAuditRow> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        ScheduleRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "scheduled audits")
}

#[utoipa::path(
    post,
    path = "/api/scheduled-audits",
    tag = "Scheduled audits",
    request_body = CreateSchedulePayload,
    responses(
        (status = 201, description = "Schedule created", body = ScheduledAudit),
        (status = 400, description = "Location or template outside the organization"),
        (status = 403, description = "Admin role required")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    ValidatedJson(payload): ValidatedJson<CreateSchedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let checked: Result<(), AppError> = async {
        let refs = ReferenceRepository;
        refs.require(&mut *rls_conn, tenant.0, Reference::Location, payload.location_id).await?;
        refs.require(&mut *rls_conn, tenant.0, Reference::Template, payload.template_id).await?;
        Ok(())
    }
    .await;
    checked.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewSchedule {
        name: payload.name.trim().to_string(),
        location_id: payload.location_id,
        template_id: payload.template_id,
        inspector_id: payload.inspector_id,
        recurrence: payload.recurrence,
        next_scheduled_date: payload.next_scheduled_date,
    };
    let schedule = ScheduleRepository
        .create(&mut *rls_conn, tenant.0, &new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::created(schedule).revalidate(views::SCHEDULES))
}

#[utoipa::path(
    patch,
    path = "/api/scheduled-audits/{id}",
    tag = "Scheduled audits",
    params(("id" = Uuid, Path, description = "Schedule id")),
    request_body = UpdateSchedulePayload,
    responses(
        (status = 200, description = "Schedule updated", body = ScheduledAudit),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such schedule")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSchedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = ScheduleChanges {
        name: payload.name,
        inspector_id: payload.inspector_id,
        recurrence: payload.recurrence,
        next_scheduled_date: payload.next_scheduled_date,
    };
    let schedule = ScheduleRepository
        .update(&mut *rls_conn, tenant.0, id, &changes)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("scheduled audit".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(schedule).revalidate(views::SCHEDULES))
}

#[utoipa::path(
    post,
    path = "/api/scheduled-audits/{id}/active",
    tag = "Scheduled audits",
    params(("id" = Uuid, Path, description = "Schedule id")),
    request_body = ScheduleActivePayload,
    responses(
        (status = 200, description = "Schedule paused or resumed", body = ScheduledAudit),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such schedule")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_schedule_active(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ScheduleActivePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let schedule = ScheduleRepository
        .set_active(&mut *rls_conn, tenant.0, id, payload.is_active)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("scheduled audit".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(schedule).revalidate(views::SCHEDULES))
}

#[utoipa::path(
    post,
    path = "/api/scheduled-audits/{id}/advance",
    tag = "Scheduled audits",
    params(("id" = Uuid, Path, description = "Schedule id")),
    request_body = AdvanceSchedulePayload,
    responses(
        (status = 200, description = "Run recorded; next date moved forward or one-off schedule deactivated", body = ScheduledAudit),
        (status = 400, description = "`ranOn` is in the future"),
        (status = 403, description = "Organization membership required"),
        (status = 404, description = "No such schedule")
    ),
    security(("api_jwt" = []))
)]
pub async fn advance_schedule(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<MemberOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AdvanceSchedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let today = Utc::now().date_naive();
    let ran_on = payload.ran_on.unwrap_or(today);
    let schedule = app_state
        .schedule_service
        .advance(&mut *rls_conn, tenant.0, id, ran_on, today)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(schedule).revalidate(views::SCHEDULES))
}

#[utoipa::path(
    delete,
    path = "/api/scheduled-audits/{id}",
    tag = "Scheduled audits",
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 200, description = "Schedule deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such schedule")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_schedule(
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

    let deleted = ScheduleRepository
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    if !deleted {
        return Err(AppError::ResourceNotFound("scheduled audit".into()).to_api_error(&locale, &app_state.i18n_store));
    }

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::SCHEDULES))
}
