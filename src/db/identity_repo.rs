// src/db/identity_repo.rs

use sqlx::{Executor, Postgres};

use crate::{common::error::AppError, models::identity::UserRecord};

/// Mirror writes. Every call maps to exactly one stored procedure.
#[derive(Clone, Copy, Default)]
pub struct IdentityRepository;

impl IdentityRepository {
    pub async fn upsert_user<'e, E>(&self, executor: E, user: &UserRecord) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_upsert_user($1, $2, $3, $4, $5)")
            .bind(&user.external_id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.avatar_url)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_user<'e, E>(&self, executor: E, external_id: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_delete_user($1)")
            .bind(external_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn upsert_organization<'e, E>(
        &self,
        executor: E,
        external_id: &str,
        name: &str,
        slug: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_upsert_organization($1, $2, $3, $4)")
            .bind(external_id)
            .bind(name)
            .bind(slug)
            .bind(image_url)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_organization<'e, E>(&self, executor: E, external_id: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_delete_organization($1)")
            .bind(external_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn upsert_membership<'e, E>(
        &self,
        executor: E,
        external_org_id: &str,
        external_user_id: &str,
        role: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_upsert_membership($1, $2, $3)")
            .bind(external_org_id)
            .bind(external_user_id)
            .bind(role)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_membership<'e, E>(
        &self,
        executor: E,
        external_org_id: &str,
        external_user_id: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT sync_delete_membership($1, $2)")
            .bind(external_org_id)
            .bind(external_user_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
