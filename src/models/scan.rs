// src/models/scan.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::location::LocationStatus;

/// What a QR token points at, read across tenants.
#[derive(Debug, Clone, FromRow)]
pub struct ScanTarget {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub status: LocationStatus,
    pub qr_enabled: bool,
}

/// Outcome recorded in the scan log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanLogOutcome {
    Success,
    Disabled,
}

impl ScanLogOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanLogOutcome::Success => "success",
            ScanLogOutcome::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanPage {
    InvalidToken,
    QrDisabled,
    LocationInactive,
    SignInRequired,
}
