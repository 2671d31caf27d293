// src/db/photo_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::photo::{AuditPhoto, NewPhoto},
};

const PHOTO_COLUMNS: &str =
    "id, audit_id, result_id, storage_path, public_url, content_type, size_bytes, caption, uploaded_by, created_at";

#[derive(Clone, Copy, Default)]
pub struct PhotoRepository;

impl PhotoRepository {
    pub async fn list_for_audit<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        audit_id: Uuid,
    ) -> Result<Vec<AuditPhoto>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM audit_photos WHERE audit_id = $1 AND organization_id = $2 ORDER BY created_at"
        );
        let photos = sqlx::query_as::<_, AuditPhoto>(&sql)
            .bind(audit_id)
            .bind(organization_id)
            .fetch_all(executor)
            .await?;
        Ok(photos)
    }

    pub async fn find<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Option<AuditPhoto>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {PHOTO_COLUMNS} FROM audit_photos WHERE id = $1 AND organization_id = $2");
        let photo = sqlx::query_as::<_, AuditPhoto>(&sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(photo)
    }

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, new: &NewPhoto) -> Result<AuditPhoto, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO audit_photos
                (organization_id, audit_id, result_id, storage_path, public_url, content_type, size_bytes, caption, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PHOTO_COLUMNS}
            "#
        );
        let photo = sqlx::query_as::<_, AuditPhoto>(&sql)
            .bind(organization_id)
            .bind(new.audit_id)
            .bind(new.result_id)
            .bind(&new.storage_path)
            .bind(&new.public_url)
            .bind(&new.content_type)
            .bind(new.size_bytes)
            .bind(&new.caption)
            .bind(new.uploaded_by)
            .fetch_one(executor)
            .await?;
        Ok(photo)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM audit_photos WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
