// src/common/response.rs

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{common::error::AppError, middleware::tenancy::OrgResolution};

/// Header listing the page paths whose cached renderings are stale after a mutation.
pub const REVALIDATE_HEADER: &str = "x-revalidate-paths";

/// Page paths affected by each entity, consumed by the rendering layer.
pub mod views {
    pub const AUDITS: &[&str] = &["/dashboard", "/dashboard/audits", "/dashboard/analytics"];
    pub const FAILED_AUDITS: &[&str] = &["/dashboard", "/dashboard/audits", "/dashboard/analytics", "/dashboard/alerts"];
    pub const ACTIONS: &[&str] = &["/dashboard", "/dashboard/actions"];
    pub const LOCATIONS: &[&str] = &["/dashboard/locations", "/dashboard/audits"];
    pub const TEMPLATES: &[&str] = &["/dashboard/templates", "/dashboard/audits"];
    pub const SCHEDULES: &[&str] = &["/dashboard/scheduled", "/dashboard"];
    pub const ALERTS: &[&str] = &["/dashboard", "/dashboard/alerts"];
    pub const NOTIFICATIONS: &[&str] = &["/dashboard/notifications"];
}

// ---
// Success half of the action contract: { success: true, data? }
// ---
pub struct ActionResponse<T> {
    status: StatusCode,
    data: Option<T>,
    revalidate: &'static [&'static str],
}

impl<T: Serialize> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: StatusCode::OK, data: Some(data), revalidate: &[] }
    }

    pub fn created(data: T) -> Self {
        Self { status: StatusCode::CREATED, data: Some(data), revalidate: &[] }
    }

    pub fn revalidate(mut self, paths: &'static [&'static str]) -> Self {
        self.revalidate = paths;
        self
    }
}

impl ActionResponse<()> {
    pub fn done() -> Self {
        Self { status: StatusCode::OK, data: None, revalidate: &[] }
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        let body = match self.data {
            Some(data) => json!({ "success": true, "data": data }),
            None => json!({ "success": true }),
        };
        let mut response = (self.status, Json(body)).into_response();

        if !self.revalidate.is_empty() {
            tracing::debug!(paths = ?self.revalidate, "Invalidating views");
            if let Ok(value) = HeaderValue::from_str(&self.revalidate.join(",")) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REVALIDATE_HEADER), value);
            }
        }
        response
    }
}

// ---
// Read paths: always 200, with an explicit reason when the list is empty by necessity
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    Ok,
    Unauthenticated,
    NoActiveOrganization,
    OrganizationNotFound,
    NotConfigured,
    Unavailable,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub status: ListStatus,
    pub data: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn ok(data: Vec<T>) -> Self {
        Self { status: ListStatus::Ok, data }
    }

    pub fn empty(status: ListStatus) -> Self {
        Self { status, data: Vec::new() }
    }

    /// Builds the degraded response for an org scope that did not resolve.
    pub fn unresolved(resolution: &OrgResolution) -> Self {
        Self::empty(resolution.list_status())
    }

    /// Store failures on read paths become an empty, explicitly flagged list.
    pub fn from_result(result: Result<Vec<T>, AppError>, what: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(AppError::StoreNotConfigured) => Self::empty(ListStatus::NotConfigured),
            Err(e) => {
                tracing::warn!("Listing {} failed, returning empty list: {}", what, e);
                Self::empty(ListStatus::Unavailable)
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn action_response_sets_revalidation_header() {
        let response = ActionResponse::created(json!({ "id": 1 }))
            .revalidate(views::AUDITS)
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[REVALIDATE_HEADER],
            "/dashboard,/dashboard/audits,/dashboard/analytics"
        );
        let body = body_of(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
    }

    #[tokio::test]
    async fn done_has_no_data() {
        let body = body_of(ActionResponse::done().into_response()).await;
        assert_eq!(body, json!({ "success": true }));
    }

    #[tokio::test]
    async fn failed_reads_degrade_to_flagged_empty_list() {
        let result: Result<Vec<u32>, AppError> = Err(AppError::ResourceNotFound("x".into()));
        let response = ListResponse::from_result(result, "things").into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_of(response).await;
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["data"], json!([]));

        let result: Result<Vec<u32>, AppError> = Err(AppError::StoreNotConfigured);
        let body = body_of(ListResponse::from_result(result, "things").into_response()).await;
        assert_eq!(body["status"], "not_configured");
    }
}
