// src/db/scan_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::scan::{ScanLogOutcome, ScanTarget},
};

/// Token lookups run before any tenant is known, on a service connection.
#[derive(Clone, Copy, Default)]
pub struct ScanRepository;

impl ScanRepository {
    pub async fn find_by_token<'e, E>(&self, executor: E, token: &str) -> Result<Option<ScanTarget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let target = sqlx::query_as::<_, ScanTarget>(
            "SELECT id, organization_id, name, status, qr_enabled FROM locations WHERE qr_code_token = $1",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(target)
    }

    pub async fn log<'e, E>(
        &self,
        executor: E,
        target: &ScanTarget,
        user_id: Option<Uuid>,
        outcome: ScanLogOutcome,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO qr_scan_logs (organization_id, location_id, user_id, outcome) VALUES ($1, $2, $3, $4)",
        )
        .bind(target.organization_id)
        .bind(target.id)
        .bind(user_id)
        .bind(outcome.as_str())
        .execute(executor)
        .await?;
        Ok(())
    }
}
