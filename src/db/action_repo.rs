// src/db/action_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{ActionFilters, ScopedQuery}},
    models::action::{Action, ActionChanges, ActionListRow, ActionStatus, NewAction},
};

const ACTION_LIST_SELECT: &str = r#"
    SELECT ac.*,
           l.name AS location_name,
           NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), '') AS assignee_name
    FROM actions ac
    JOIN locations l ON l.id = ac.location_id
    LEFT JOIN users u ON u.id = ac.assigned_to"#;

#[derive(Clone, Copy, Default)]
pub struct ActionRepository;

impl ActionRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &ActionFilters,
    ) -> Result<Vec<ActionListRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(ACTION_LIST_SELECT, "ac.organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY ac.created_at DESC", None);

        let actions = qb.build_query_as::<ActionListRow>().fetch_all(executor).await?;
        Ok(actions)
    }

    pub async fn find_row<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ActionListRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{ACTION_LIST_SELECT} WHERE ac.id = $1 AND ac.organization_id = $2");
        let row = sqlx::query_as::<_, ActionListRow>(&sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, new: &NewAction) -> Result<Action, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = sqlx::query_as::<_, Action>(
            r#"
            INSERT INTO actions (organization_id, location_id, audit_id, title, description, urgency, deadline, assigned_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(new.location_id)
        .bind(new.audit_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.urgency)
        .bind(new.deadline)
        .bind(new.assigned_to)
        .fetch_one(executor)
        .await?;
        Ok(action)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        changes: &ActionChanges,
    ) -> Result<Option<Action>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = sqlx::query_as::<_, Action>(
            r#"
            UPDATE actions
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                urgency = COALESCE($5, urgency),
                deadline = COALESCE($6, deadline),
                assigned_to = COALESCE($7, assigned_to),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.urgency)
        .bind(changes.deadline)
        .bind(changes.assigned_to)
        .fetch_optional(executor)
        .await?;
        Ok(action)
    }

    /// `completed_at` is stamped on entering `completed` and cleared on leaving it.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        status: ActionStatus,
    ) -> Result<Option<Action>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = sqlx::query_as::<_, Action>(
            r#"
            UPDATE actions
            SET status = $3,
                completed_at = CASE WHEN $3 = 'completed'::action_status
                                    THEN COALESCE(completed_at, NOW())
                                    ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(action)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM actions WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
