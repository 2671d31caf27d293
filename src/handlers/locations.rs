// src/handlers/locations.rs

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{get_rls_connection, get_tenant_connection},
        error::{ApiError, AppError},
        filters::LocationFilters,
        response::{views, ActionResponse, ListResponse},
    },
    config::AppState,
    db::LocationRepository,
    handlers::ValidatedJson,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
        tenancy::OrgScope,
    },
    models::location::{Location, LocationFields, LocationStatus},
    services::location_service::{generate_qr_token, render_qr_png, scan_url},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    #[validate(length(min = 1, max = 200, message = "validation.required"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

impl LocationPayload {
    fn into_fields(self) -> LocationFields {
        LocationFields {
            name: self.name.trim().to_string(),
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationStatusPayload {
    pub status: LocationStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrSettingsPayload {
    /// Issue a new token, invalidating printed codes
    #[serde(default)]
    pub regenerate: bool,
    pub qr_enabled: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/locations",
    tag = "Locations",
    params(LocationFilters),
    responses((status = 200, description = "Locations by name", body = ListResponse<Location>)),
    security(("api_jwt" = []))
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(filters): Query<LocationFilters>,
) -> ListResponse<Location> {
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        LocationRepository.list(&mut *conn, tenant.0, &filters).await
    }
    .await;

    ListResponse::from_result(result, "locations")
}

#[utoipa::path(
    get,
    path = "/api/locations/{id}",
    tag = "Locations",
    params(("id" = Uuid, Path, description = "Location id")),
    responses(
        (status = 200, description = "The location", body = Location),
        (status = 404, description = "No such location")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_location(
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

    let location = LocationRepository
        .find(&mut *conn, tenant.0, id)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("location".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(location))
}

#[utoipa::path(
    post,
    path = "/api/locations",
    tag = "Locations",
    request_body = LocationPayload,
    responses(
        (status = 201, description = "Location created with QR scanning enabled", body = Location),
        (status = 403, description = "Admin role required")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_location(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    ValidatedJson(payload): ValidatedJson<LocationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let location = LocationRepository
        .create(&mut *rls_conn, tenant.0, &payload.into_fields(), &generate_qr_token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(location_id = %location.id, "Location created");
    Ok(ActionResponse::created(location).revalidate(views::LOCATIONS))
}

#[utoipa::path(
    patch,
    path = "/api/locations/{id}",
    tag = "Locations",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Location updated", body = Location),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such location")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_location(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<LocationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let location = LocationRepository
        .update(&mut *rls_conn, tenant.0, id, &payload.into_fields())
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("location".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(location).revalidate(views::LOCATIONS))
}

#[utoipa::path(
    post,
    path = "/api/locations/{id}/status",
    tag = "Locations",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = LocationStatusPayload,
    responses(
        (status = 200, description = "Location activated or deactivated", body = Location),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such location")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_location_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<LocationStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let location = LocationRepository
        .set_status(&mut *rls_conn, tenant.0, id, payload.status)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("location".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(location_id = %id, status = ?payload.status, "Location status changed");
    Ok(ActionResponse::ok(location).revalidate(views::LOCATIONS))
}

#[utoipa::path(
    post,
    path = "/api/locations/{id}/qr",
    tag = "Locations",
    params(("id" = Uuid, Path, description = "Location id")),
    request_body = QrSettingsPayload,
    responses(
        (status = 200, description = "QR token and/or scanning flag updated", body = Location),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such location")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_location_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    OrgScope(scope): OrgScope,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<QrSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new_token = payload.regenerate.then(generate_qr_token);
    let location = LocationRepository
        .update_qr(&mut *rls_conn, tenant.0, id, new_token.as_deref(), payload.qr_enabled)
        .await
        .and_then(|found| found.ok_or_else(|| AppError::ResourceNotFound("location".into())))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    rls_conn
        .commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    if new_token.is_some() {
        tracing::info!(location_id = %id, "QR token regenerated");
    }
    Ok(ActionResponse::ok(location).revalidate(views::LOCATIONS))
}

#[utoipa::path(
    get,
    path = "/api/locations/{id}/qr.png",
    tag = "Locations",
    params(("id" = Uuid, Path, description = "Location id")),
    responses(
        (status = 200, description = "QR code encoding the location's scan URL", content_type = "image/png"),
        (status = 404, description = "No such location, or it has no QR token")
    ),
    security(("api_jwt" = []))
)]
pub async fn location_qr_png(
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

    let token = LocationRepository
        .find(&mut *conn, tenant.0, id)
        .await
        .and_then(|found| {
            found
                .and_then(|location| location.qr_code_token)
                .ok_or_else(|| AppError::ResourceNotFound("location".into()))
        })
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let png = render_qr_png(&scan_url(&app_state.settings.app_base_url, &token))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
