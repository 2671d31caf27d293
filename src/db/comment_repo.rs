// src/db/comment_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::comment::ActionComment};

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.action_id, c.author_id, c.body, c.created_at,
           NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), '') AS author_name,
           u.avatar_url AS author_avatar_url
    FROM action_comments c
    LEFT JOIN users u ON u.id = c.author_id"#;

#[derive(Clone, Copy, Default)]
pub struct CommentRepository;

impl CommentRepository {
    pub async fn list_for_action<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        action_id: Uuid,
    ) -> Result<Vec<ActionComment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{COMMENT_SELECT} WHERE c.action_id = $1 AND c.organization_id = $2 ORDER BY c.created_at ASC");
        let comments = sqlx::query_as::<_, ActionComment>(&sql)
            .bind(action_id)
            .bind(organization_id)
            .fetch_all(executor)
            .await?;
        Ok(comments)
    }

    /// Inserts and returns the comment with its author projection in one round trip.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        action_id: Uuid,
        author_id: Option<Uuid>,
        body: &str,
    ) -> Result<ActionComment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comment = sqlx::query_as::<_, ActionComment>(
            r#"
            WITH inserted AS (
                INSERT INTO action_comments (organization_id, action_id, author_id, body)
                SELECT $1, a.id, $3, $4 FROM actions a WHERE a.id = $2 AND a.organization_id = $1
                RETURNING *
            )
            SELECT c.id, c.action_id, c.author_id, c.body, c.created_at,
                   NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), '') AS author_name,
                   u.avatar_url AS author_avatar_url
            FROM inserted c
            LEFT JOIN users u ON u.id = c.author_id
            "#,
        )
        .bind(organization_id)
        .bind(action_id)
        .bind(author_id)
        .bind(body)
        .fetch_optional(executor)
        .await?;
        comment.ok_or_else(|| AppError::ResourceNotFound("action".into()))
    }

    /// `Some(author)` when the comment exists.
    pub async fn find_author<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Option<Uuid>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let author = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT author_id FROM action_comments WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(author)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM action_comments WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
