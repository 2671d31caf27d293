// src/db/template_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{ScopedQuery, TemplateFilters}},
    models::template::{AuditTemplate, TemplateCategory, TemplateChanges, TemplateItem},
};

#[derive(Clone, Copy, Default)]
pub struct TemplateRepository;

impl TemplateRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &TemplateFilters,
    ) -> Result<Vec<AuditTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new("SELECT * FROM audit_templates", "organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY created_at DESC", None);

        let templates = qb.build_query_as::<AuditTemplate>().fetch_all(executor).await?;
        Ok(templates)
    }

    pub async fn find<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Option<AuditTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, AuditTemplate>(
            "SELECT * FROM audit_templates WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(template)
    }

    pub async fn categories<'e, E>(&self, executor: E, template_id: Uuid) -> Result<Vec<TemplateCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, TemplateCategory>(
            "SELECT id, template_id, name, position FROM template_categories WHERE template_id = $1 ORDER BY position",
        )
        .bind(template_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn items<'e, E>(&self, executor: E, template_id: Uuid) -> Result<Vec<TemplateItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, TemplateItem>(
            r#"
            SELECT id, template_id, category_id, label, description, position
            FROM template_items
            WHERE template_id = $1
            ORDER BY position
            "#,
        )
        .bind(template_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn item_ids<'e, E>(&self, executor: E, template_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM template_items WHERE template_id = $1")
            .bind(template_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn insert_template<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
        pass_threshold: Decimal,
        requires_photos: bool,
    ) -> Result<AuditTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AuditTemplate>(
            r#"
            INSERT INTO audit_templates (organization_id, name, description, pass_threshold, requires_photos)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(description)
        .bind(pass_threshold)
        .bind(requires_photos)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_db(e, "template"))
    }

    pub async fn insert_category<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        template_id: Uuid,
        name: &str,
        position: i32,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO template_categories (organization_id, template_id, name, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(template_id)
        .bind(name)
        .bind(position)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        template_id: Uuid,
        category_id: Uuid,
        label: &str,
        description: Option<&str>,
        position: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO template_items (organization_id, template_id, category_id, label, description, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(organization_id)
        .bind(template_id)
        .bind(category_id)
        .bind(label)
        .bind(description)
        .bind(position)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        changes: &TemplateChanges,
    ) -> Result<Option<AuditTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, AuditTemplate>(
            r#"
            UPDATE audit_templates
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                pass_threshold = COALESCE($5, pass_threshold),
                requires_photos = COALESCE($6, requires_photos),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.pass_threshold)
        .bind(changes.requires_photos)
        .bind(changes.is_active)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_db(e, "template"))?;
        Ok(template)
    }

    /// Audits and schedules both hold the template without cascading.
    pub async fn count_references<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM audits WHERE template_id = $1 AND organization_id = $2)
                 + (SELECT COUNT(*) FROM scheduled_audits WHERE template_id = $1 AND organization_id = $2)
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Categories and items go with the template (`ON DELETE CASCADE`).
    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM audit_templates WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::InvalidReference(_) => AppError::Conflict("errors.template_in_use"),
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }
}
