// src/db/alert_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{AlertFilters, ScopedQuery}},
    models::alert::{Alert, NewAlert},
};

#[derive(Clone, Copy, Default)]
pub struct AlertRepository;

impl AlertRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &AlertFilters,
    ) -> Result<Vec<Alert>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new("SELECT * FROM alerts", "organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY created_at DESC", None);

        let alerts = qb.build_query_as::<Alert>().fetch_all(executor).await?;
        Ok(alerts)
    }

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, new: &NewAlert) -> Result<Alert, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (organization_id, location_id, audit_id, severity, title, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(new.location_id)
        .bind(new.audit_id)
        .bind(new.severity)
        .bind(&new.title)
        .bind(&new.message)
        .fetch_one(executor)
        .await?;
        Ok(alert)
    }

    pub async fn mark_read<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Option<Alert>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let alert = sqlx::query_as::<_, Alert>(
            "UPDATE alerts SET is_read = TRUE WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(alert)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
