// src/models/audit.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "audit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl AuditStatus {
    /// Completed and cancelled audits take no further results.
    pub fn is_closed(self) -> bool {
        matches!(self, AuditStatus::Completed | AuditStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub location_id: Uuid,
    pub template_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub audit_date: NaiveDate,
    pub status: AuditStatus,
    #[schema(value_type = Option<f64>)]
    pub pass_percentage: Option<Decimal>,
    pub passed: Option<bool>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection: the audit plus the names of what it points at.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditListRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub location_name: String,
    pub template_name: String,
    pub inspector_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub item_id: Uuid,
    /// `None` means not applicable
    pub passed: Option<bool>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditDetail {
    #[serde(flatten)]
    pub audit: AuditListRow,
    pub results: Vec<AuditResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultInput {
    pub item_id: Uuid,
    pub passed: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAudit {
    pub location_id: Uuid,
    pub template_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub audit_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditChanges {
    pub status: Option<AuditStatus>,
    pub audit_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
