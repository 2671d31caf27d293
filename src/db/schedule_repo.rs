// src/db/schedule_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{ScheduleFilters, ScopedQuery}},
    models::schedule::{NewSchedule, ScheduleChanges, ScheduledAudit, ScheduledAuditRow},
};

const SCHEDULE_LIST_SELECT: &str = r#"
    SELECT s.*,
           l.name AS location_name,
           t.name AS template_name,
           NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), '') AS inspector_name
    FROM scheduled_audits s
    JOIN locations l ON l.id = s.location_id
    JOIN audit_templates t ON t.id = s.template_id
    LEFT JOIN users u ON u.id = s.inspector_id"#;

#[derive(Clone, Copy, Default)]
pub struct ScheduleRepository;

impl ScheduleRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &ScheduleFilters,
    ) -> Result<Vec<ScheduledAuditRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(SCHEDULE_LIST_SELECT, "s.organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY s.next_scheduled_date ASC", None);

        let rows = qb.build_query_as::<ScheduledAuditRow>().fetch_all(executor).await?;
        Ok(rows.into_iter().map(ScheduledAuditRow::with_label).collect())
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ScheduledAudit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let schedule = sqlx::query_as::<_, ScheduledAudit>(
            "SELECT * FROM scheduled_audits WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(schedule)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: &NewSchedule,
    ) -> Result<ScheduledAudit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let schedule = sqlx::query_as::<_, ScheduledAudit>(
            r#"
            INSERT INTO scheduled_audits
                (organization_id, name, location_id, template_id, inspector_id, recurrence, next_scheduled_date, anchor_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&new.name)
        .bind(new.location_id)
        .bind(new.template_id)
        .bind(new.inspector_id)
        .bind(new.recurrence)
        .bind(new.next_scheduled_date)
        .fetch_one(executor)
        .await?;
        Ok(schedule)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        changes: &ScheduleChanges,
    ) -> Result<Option<ScheduledAudit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let schedule = sqlx::query_as::<_, ScheduledAudit>(
            r#"
            UPDATE scheduled_audits
            SET name = COALESCE($3, name),
                inspector_id = COALESCE($4, inspector_id),
                recurrence = COALESCE($5, recurrence),
                next_scheduled_date = COALESCE($6, next_scheduled_date),
                anchor_date = COALESCE($6, anchor_date),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&changes.name)
        .bind(changes.inspector_id)
        .bind(changes.recurrence)
        .bind(changes.next_scheduled_date)
        .fetch_optional(executor)
        .await?;
        Ok(schedule)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<ScheduledAudit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let schedule = sqlx::query_as::<_, ScheduledAudit>(
            r#"
            UPDATE scheduled_audits SET is_active = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(schedule)
    }

    /// Stores a run. With no next date the schedule is finished and deactivated.
    pub async fn record_run<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        ran_on: NaiveDate,
        next: Option<NaiveDate>,
    ) -> Result<ScheduledAudit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let schedule = sqlx::query_as::<_, ScheduledAudit>(
            r#"
            UPDATE scheduled_audits
            SET last_run_date = $3,
                next_scheduled_date = COALESCE($4, next_scheduled_date),
                is_active = ($4 IS NOT NULL) AND is_active,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(ran_on)
        .bind(next)
        .fetch_one(executor)
        .await?;
        Ok(schedule)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM scheduled_audits WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
