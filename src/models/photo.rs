// src/models/photo.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditPhoto {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub result_id: Option<Uuid>,
    pub storage_path: String,
    pub public_url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub caption: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub audit_id: Uuid,
    pub result_id: Option<Uuid>,
    pub storage_path: String,
    pub public_url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub caption: Option<String>,
    pub uploaded_by: Option<Uuid>,
}
