// src/handlers/actions.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        filters::ActionFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::{ActionRepository, Reference, ReferenceRepository},
    handlers::ValidatedJson,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::OrgScope},
    models::action::{Action, ActionChanges, ActionListRow, ActionStatus, NewAction, Urgency},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionPayload {
    pub location_id: Uuid,
    pub audit_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "validation.required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
    pub deadline: Option<NaiveDate>,
    /// Internal user id of the assignee
    pub assigned_to: Option<Uuid>,
}

fn default_urgency() -> Urgency {
    Urgency::Medium
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActionPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub urgency: Option<Urgency>,
    pub deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ActionStatusPayload {
    pub status: ActionStatus,
}

#[utoipa::path(
    get,
    path = "/api/actions",
    tag = "Actions",
    params(ActionFilters),
    responses((status = 200, description = "Corrective actions, newest first", body = ListResponse<ActionListRow>)),
    security(("api_jwt" = []))
)]
pub async fn list_actions(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<ActionFilters>,
) -> ListResponse<ActionListRow> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        ActionRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "actions")
}

#[utoipa::path(
    get,
    path = "/api/actions/{id}",
    tag = "Actions",
    params(("id" = Uuid, Path, description = "Action id")),
    responses(
        (status = 200, description = "The action", body = ActionListRow),
        (status = 404, description = "No such action")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_action(
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

    let action = ActionRepository
        .find_row(&mut *conn, tenant.0, id)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("action".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(action))
}

#[utoipa::path(
    post,
    path = "/api/actions",
    tag = "Actions",
    request_body = CreateActionPayload,
    responses(
        (status = 201, description = "Action created", body = Action),
        (status = 400, description = "Invalid payload, or a location or audit outside the organization")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_action(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    ValidatedJson(payload): ValidatedJson<CreateActionPayload>,
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
        if let Some(audit_id) = payload.audit_id {
            refs.require(&mut *rls_conn, tenant.0, Reference::Audit, audit_id).await?;
        }
        Ok(())
    }
    .await;
    checked.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewAction {
        location_id: payload.location_id,
        audit_id: payload.audit_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        urgency: payload.urgency,
        deadline: payload.deadline,
        assigned_to: payload.assigned_to,
    };
    let action = ActionRepository
        .create(&mut *rls_conn, tenant.0, &new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(action_id = %action.id, "Corrective action created");
    Ok(ActionResponse::created(action).revalidate(views::ACTIONS))
}

#[utoipa::path(
    patch,
    path = "/api/actions/{id}",
    tag = "Actions",
    params(("id" = Uuid, Path, description = "Action id")),
    request_body = UpdateActionPayload,
    responses(
        (status = 200, description = "Action updated", body = Action),
        (status = 404, description = "No such action")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_action(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateActionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = ActionChanges {
        title: payload.title,
        description: payload.description,
        urgency: payload.urgency,
        deadline: payload.deadline,
        assigned_to: payload.assigned_to,
    };
    let action = ActionRepository
        .update(&mut *rls_conn, tenant.0, id, &changes)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("action".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(action).revalidate(views::ACTIONS))
}

#[utoipa::path(
    post,
    path = "/api/actions/{id}/status",
    tag = "Actions",
    params(("id" = Uuid, Path, description = "Action id")),
    request_body = ActionStatusPayload,
    responses(
        (status = 200, description = "Status changed; completedAt follows the completed state", body = Action),
        (status = 404, description = "No such action")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_action_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ActionStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let action = ActionRepository
        .set_status(&mut *rls_conn, tenant.0, id, payload.status)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("action".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(action_id = %id, status = ?payload.status, "Action status changed");
    Ok(ActionResponse::ok(action).revalidate(views::ACTIONS))
}

#[utoipa::path(
    delete,
    path = "/api/actions/{id}",
    tag = "Actions",
    params(("id" = Uuid, Path, description = "Action id")),
    responses(
        (status = 200, description = "Action and its comments removed"),
        (status = 404, description = "No such action")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_action(
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

    let deleted = ActionRepository
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    if !deleted {
        return Err(AppError::ResourceNotFound("action".into()).to_api_error(&locale, &app_state.i18n_store));
    }

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::ACTIONS))
}
