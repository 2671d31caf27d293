// src/db/notification_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::notification::Notification};

const PAGE_SIZE: i64 = 50;

#[derive(Clone, Copy, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn list_for_user<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, link, read_at, created_at
            FROM notifications
            WHERE organization_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(PAGE_SIZE)
        .fetch_all(executor)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count<'e, E>(&self, executor: E, organization_id: Uuid, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE organization_id = $1 AND user_id = $2 AND read_at IS NULL",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn mark_read<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND organization_id = $2 AND user_id = $3
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, organization_id: Uuid, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() WHERE organization_id = $1 AND user_id = $2 AND read_at IS NULL",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
