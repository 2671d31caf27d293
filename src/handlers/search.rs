// src/handlers/search.rs

use axum::extract::{Query, State};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::{db_utils::get_tenant_connection, response::ListResponse},
    config::AppState,
    middleware::tenancy::OrgScope,
    models::search::SearchHit,
    services::search_service::normalize_term,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// At least 2 characters after trimming
    #[serde(default)]
    pub q: String,
}

#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Search",
    params(SearchQuery),
    responses((status = 200, description = "Audits, actions, locations and templates matching the term, in that order", body = ListResponse<SearchHit>)),
    security(("api_jwt" = []))
)]
pub async fn search(
    State(app_state): State<AppState>,
    OrgScope(scope): OrgScope,
    Query(query): Query<SearchQuery>,
) -> ListResponse<SearchHit> {
    // short terms never reach the store
    if normalize_term(&query.q).is_none() {
        return ListResponse::ok(Vec::new());
    }
    let Some(tenant) = scope.tenant() else {
        return ListResponse::unresolved(&scope);
    };

    let result = async {
        let mut conn = get_tenant_connection(&app_state, &tenant).await?;
        app_state.search_service.search(&mut *conn, tenant.0, &query.q).await
    }
    .await;

    ListResponse::from_result(result, "search results")
}
