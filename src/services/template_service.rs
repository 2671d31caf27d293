// src/services/template_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TemplateRepository,
    models::template::{NewTemplate, TemplateDetail},
};

#[derive(Clone, Default)]
pub struct TemplateService {
    template_repo: TemplateRepository,
}

impl TemplateService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_detail<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<TemplateDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let template = self
            .template_repo
            .find(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("template".into()))?;
        let categories = self.template_repo.categories(&mut *tx, id).await?;
        let items = self.template_repo.items(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(TemplateDetail::assemble(template, categories, items))
    }

    /// Modelo, categorias e itens entram juntos ou não entram.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: &NewTemplate,
    ) -> Result<TemplateDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let template = self
            .template_repo
            .insert_template(
                &mut *tx,
                organization_id,
                &new.name,
                new.description.as_deref(),
                new.pass_threshold,
                new.requires_photos,
            )
            .await?;

        for (c_pos, category) in new.categories.iter().enumerate() {
            let category_id = self
                .template_repo
                .insert_category(&mut *tx, organization_id, template.id, &category.name, c_pos as i32)
                .await?;

            for (i_pos, item) in category.items.iter().enumerate() {
                self.template_repo
                    .insert_item(
                        &mut *tx,
                        organization_id,
                        template.id,
                        category_id,
                        &item.label,
                        item.description.as_deref(),
                        i_pos as i32,
                    )
                    .await?;
            }
        }

        let categories = self.template_repo.categories(&mut *tx, template.id).await?;
        let items = self.template_repo.items(&mut *tx, template.id).await?;

        tx.commit().await?;
        Ok(TemplateDetail::assemble(template, categories, items))
    }

    /// Recusa enquanto auditorias ou agendamentos ainda usam o modelo.
    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        if self.template_repo.count_references(&mut *tx, organization_id, id).await? > 0 {
            return Err(AppError::Conflict("errors.template_in_use"));
        }
        if !self.template_repo.delete(&mut *tx, organization_id, id).await? {
            return Err(AppError::ResourceNotFound("template".into()));
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::audit::AuditStatus};
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    #[sqlx::test]
    async fn schedules_keep_their_template_alive(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let location = fixtures::location(&pool, org, "Main kitchen").await;
        let (template, _) = fixtures::template(&pool, org, 1).await;
        sqlx::query(
            r#"
            INSERT INTO scheduled_audits (organization_id, name, location_id, template_id, recurrence, next_scheduled_date, anchor_date)
            VALUES ($1, 'Weekly kitchen check', $2, $3, 'weekly', DATE '2024-05-06', DATE '2024-05-06')
            "#,
        )
        .bind(org)
        .bind(location)
        .bind(template)
        .execute(&pool)
        .await?;

        let mut conn = pool.acquire().await?;
        let err = TemplateService::new().delete(&mut *conn, org, template).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict("errors.template_in_use")));
        assert!(TemplateRepository.find(&mut *conn, org, template).await?.is_some());
        Ok(())
    }

    #[sqlx::test]
    async fn audits_keep_their_template_alive(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let location = fixtures::location(&pool, org, "Main kitchen").await;
        let (template, _) = fixtures::template(&pool, org, 1).await;
        fixtures::audit(&pool, org, location, template, AuditStatus::Draft).await;

        let mut conn = pool.acquire().await?;
        let err = TemplateService::new().delete(&mut *conn, org, template).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict("errors.template_in_use")));
        Ok(())
    }

    #[sqlx::test]
    async fn unused_templates_are_deleted_with_their_items(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let (template, _) = fixtures::template(&pool, org, 3).await;

        let mut conn = pool.acquire().await?;
        TemplateService::new().delete(&mut *conn, org, template).await?;

        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM template_items WHERE template_id = $1")
            .bind(template)
            .fetch_one(&mut *conn)
            .await?;
        assert_eq!(items, 0);
        Ok(())
    }
}
