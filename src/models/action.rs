// src/models/action.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "action_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "urgency_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub location_id: Uuid,
    pub audit_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: ActionStatus,
    pub urgency: Urgency,
    pub deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionListRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub action: Action,
    pub location_name: String,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAction {
    pub location_id: Uuid,
    pub audit_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub urgency: Urgency,
    pub deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ActionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<Urgency>,
    pub deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
}
