// src/handlers/templates.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        filters::TemplateFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::TemplateRepository,
    handlers::ValidatedJson,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
        tenancy::OrgScope,
    },
    models::template::{AuditTemplate, NewCategory, NewItem, NewTemplate, TemplateChanges, TemplateDetail},
};

fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0);
        err.add_param("max".into(), &100);
        return Err(err);
    }
    Ok(())
}

fn default_threshold() -> Decimal {
    Decimal::from(80)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    #[validate(length(min = 1, max = 500, message = "validation.required"))]
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 200, message = "validation.required"))]
    pub name: String,
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplatePayload {
    #[validate(length(min = 1, max = 200, message = "validation.required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_percentage"))]
    #[serde(default = "default_threshold")]
    #[schema(value_type = f64, example = 80)]
    pub pass_threshold: Decimal,
    #[serde(default)]
    pub requires_photos: bool,
    #[validate(nested)]
    #[serde(default)]
    pub categories: Vec<CategoryPayload>,
}

impl From<CreateTemplatePayload> for NewTemplate {
    fn from(payload: CreateTemplatePayload) -> Self {
        NewTemplate {
            name: payload.name.trim().to_string(),
            description: payload.description,
            pass_threshold: payload.pass_threshold,
            requires_photos: payload.requires_photos,
            categories: payload
                .categories
                .into_iter()
                .map(|c| NewCategory {
                    name: c.name,
                    items: c
                        .items
                        .into_iter()
                        .map(|i| NewItem { label: i.label, description: i.description })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_percentage"))]
    #[schema(value_type = Option<f64>)]
    pub pass_threshold: Option<Decimal>,
    pub requires_photos: Option<bool>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "Templates",
    params(TemplateFilters),
    responses((status = 200, description = "Audit templates, newest first", body = ListResponse<AuditTemplate>)),
    security(("api_jwt" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<TemplateFilters>,
) -> ListResponse<AuditTemplate> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        TemplateRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "templates")
}

#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template with its categories and items", body = TemplateDetail),
        (status = 404, description = "No such template")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_template(
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
        .template_service
        .get_detail(&mut *conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(detail))
}

#[utoipa::path(
    post,
    path = "/api/templates",
    tag = "Templates",
    request_body = CreateTemplatePayload,
    responses(
        (status = 201, description = "Template, categories and items created together", body = TemplateDetail),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin role required")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    ValidatedJson(payload): ValidatedJson<CreateTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .template_service
        .create(&mut *rls_conn, tenant.0, &NewTemplate::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::created(detail).revalidate(views::TEMPLATES))
}

#[utoipa::path(
    patch,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = UpdateTemplatePayload,
    responses(
        (status = 200, description = "Template updated", body = AuditTemplate),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such template")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = TemplateChanges {
        name: payload.name,
        description: payload.description,
        pass_threshold: payload.pass_threshold,
        requires_photos: payload.requires_photos,
        is_active: payload.is_active,
    };
    let template = TemplateRepository
        .update(&mut *rls_conn, tenant.0, id, &changes)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("template".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(template).revalidate(views::TEMPLATES))
}

#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such template"),
        (status = 409, description = "Audits still reference the template")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_template(
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

    app_state
        .template_service
        .delete(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done().revalidate(views::TEMPLATES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn threshold_must_be_a_percentage() {
        assert!(validate_percentage(&Decimal::ZERO).is_ok());
        assert!(validate_percentage(&Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percentage(&Decimal::from(-1)).is_err());
        assert!(validate_percentage(&Decimal::from(101)).is_err());
    }

    #[test]
    fn nested_items_are_validated() {
        let payload: CreateTemplatePayload = serde_json::from_value(json!({
            "name": "Kitchen",
            "categories": [{ "name": "Hygiene", "items": [{ "label": "" }] }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payload_defaults_and_conversion() {
        let payload: CreateTemplatePayload = serde_json::from_value(json!({
            "name": "  Kitchen  ",
            "categories": [{ "name": "Hygiene", "items": [{ "label": "Hands washed" }] }]
        }))
        .unwrap();
        assert!(payload.validate().is_ok());

        let new = NewTemplate::from(payload);
        assert_eq!(new.name, "Kitchen");
        assert_eq!(new.pass_threshold, Decimal::from(80));
        assert!(!new.requires_photos);
        assert_eq!(new.categories[0].items[0].label, "Hands washed");
    }
}
