// src/db/organization_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

/// Reads over the identity mirror. Writes go through the sync procedures
/// (see `IdentityRepository`).
#[derive(Clone, Copy, Default)]
pub struct OrganizationRepository;

impl OrganizationRepository {
    pub async fn find_id_by_external_id<'e, E>(
        &self,
        executor: E,
        external_id: &str,
    ) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM organizations WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(executor)
            .await?;
        Ok(id)
    }

    /// Internal id of a mirrored user, if the webhook has seen them.
    pub async fn find_user_id<'e, E>(&self, executor: E, external_user_id: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE external_id = $1")
            .bind(external_user_id)
            .fetch_optional(executor)
            .await?;
        Ok(id)
    }
}
