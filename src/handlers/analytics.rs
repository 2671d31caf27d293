// src/handlers/analytics.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    common::{
        db_utils::get_tenant_connection,
        error::{ApiError, AppError},
        filters::AnalyticsFilters,
        response::ActionResponse,
    },
    config::AppState,
    db::AnalyticsRepository,
    middleware::{i18n::Locale, tenancy::{OrgScope, TenantContext}},
    models::analytics::AnalyticsOverview,
};

/// Runs the three aggregate queries concurrently, each on its own connection.
/// Any failure fails the whole overview.
async fn overview(
    app_state: &AppState,
    tenant: TenantContext,
    filters: &AnalyticsFilters,
) -> Result<AnalyticsOverview, AppError> {
    let summary = async {
        let mut conn = get_tenant_connection(app_state, &tenant).await?;
        AnalyticsRepository.summary(&mut *conn, tenant.0, filters).await
    };
    let by_location = async {
        let mut conn = get_tenant_connection(app_state, &tenant).await?;
        AnalyticsRepository.by_location(&mut *conn, tenant.0, filters).await
    };
    let actions_by_status = async {
        let mut conn = get_tenant_connection(app_state, &tenant).await?;
        AnalyticsRepository.actions_by_status(&mut *conn, tenant.0, filters).await
    };

    let (summary, by_location, actions_by_status) = tokio::try_join!(summary, by_location, actions_by_status)?;
    Ok(AnalyticsOverview { summary, by_location, actions_by_status })
}

#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    tag = "Analytics",
    params(AnalyticsFilters),
    responses(
        (status = 200, description = "Audit summary, per-location breakdown and action counts", body = AnalyticsOverview),
        (status = 500, description = "One of the aggregate queries failed")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_overview(
    State(app_state): State<AppState>,
    locale: Locale,
    OrgScope(scope): OrgScope,
    Query(filters): Query<AnalyticsFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let overview = overview(&app_state, tenant, &filters)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::ok(overview))
}
