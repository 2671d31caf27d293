// src/db/reference_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

/// Tenant-owned rows a payload may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Location,
    Template,
    Audit,
}

impl Reference {
    fn table(self) -> &'static str {
        match self {
            Reference::Location => "locations",
            Reference::Template => "audit_templates",
            Reference::Audit => "audits",
        }
    }

    /// Payload field reported back when the reference is rejected.
    pub fn field(self) -> &'static str {
        match self {
            Reference::Location => "locationId",
            Reference::Template => "templateId",
            Reference::Audit => "auditId",
        }
    }
}

fn rejected(field: &'static str) -> AppError {
    AppError::field(field, "invalid_reference", "validation.invalid_reference")
}

#[derive(Clone, Copy, Default)]
pub struct ReferenceRepository;

impl ReferenceRepository {
    /// Foreign keys only prove the row exists somewhere; this also pins it to the tenant.
    pub async fn require<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        kind: Reference,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND organization_id = $2)", kind.table());
        let found: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(organization_id)
            .fetch_one(executor)
            .await?;

        if found { Ok(()) } else { Err(rejected(kind.field())) }
    }

    pub async fn require_result<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        audit_id: Uuid,
        result_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM audit_results WHERE id = $1 AND audit_id = $2 AND organization_id = $3)",
        )
        .bind(result_id)
        .bind(audit_id)
        .bind(organization_id)
        .fetch_one(executor)
        .await?;

        if found { Ok(()) } else { Err(rejected("resultId")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::audit::AuditStatus};
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    #[sqlx::test]
    async fn foreign_rows_are_rejected_by_field(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org_a = fixtures::organization(&pool, "org_a").await;
        let org_b = fixtures::organization(&pool, "org_b").await;
        let (foreign_template, _) = fixtures::template(&pool, org_b, 1).await;
        let (own_template, _) = fixtures::template(&pool, org_a, 1).await;

        let err = ReferenceRepository
            .require(&pool, org_a, Reference::Template, foreign_template)
            .await
            .unwrap_err();
        match err {
            AppError::ValidationError(errors) => assert!(errors.field_errors().contains_key("templateId")),
            other => panic!("unexpected {other:?}"),
        }
        ReferenceRepository.require(&pool, org_a, Reference::Template, own_template).await?;
        Ok(())
    }

    #[sqlx::test]
    async fn photo_results_must_come_from_the_same_audit(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let location = fixtures::location(&pool, org, "Main kitchen").await;
        let (template, items) = fixtures::template(&pool, org, 1).await;
        let first = fixtures::audit(&pool, org, location, template, AuditStatus::InProgress).await;
        let second = fixtures::audit(&pool, org, location, template, AuditStatus::InProgress).await;

        let result_id: Uuid = sqlx::query_scalar(
            "INSERT INTO audit_results (organization_id, audit_id, item_id, passed) VALUES ($1, $2, $3, TRUE) RETURNING id",
        )
        .bind(org)
        .bind(first)
        .bind(items[0])
        .fetch_one(&pool)
        .await?;

        ReferenceRepository.require_result(&pool, org, first, result_id).await?;
        let err = ReferenceRepository.require_result(&pool, org, second, result_id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        Ok(())
    }

    #[sqlx::test]
    async fn dangling_keys_surface_as_invalid_references(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let (template, _) = fixtures::template(&pool, org, 1).await;

        let err: AppError = sqlx::query("INSERT INTO audits (organization_id, location_id, template_id) VALUES ($1, $2, $3)")
            .bind(org)
            .bind(Uuid::new_v4())
            .bind(template)
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::InvalidReference(ref c) if c == "audits_location_id_fkey"));
        Ok(())
    }
}
