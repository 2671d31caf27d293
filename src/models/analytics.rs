// src/models/analytics.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_audits: i64,
    pub completed_audits: i64,
    pub passed_audits: i64,
    /// Passed over completed, in percent
    #[schema(value_type = Option<f64>)]
    pub pass_rate: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub average_score: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationBreakdown {
    pub location_id: Uuid,
    pub location_name: String,
    pub total_audits: i64,
    pub passed_audits: i64,
    #[schema(value_type = Option<f64>)]
    pub average_score: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub summary: AuditSummary,
    pub by_location: Vec<LocationBreakdown>,
    pub actions_by_status: Vec<ActionStatusCount>,
}
