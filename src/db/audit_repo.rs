// src/db/audit_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{AuditFilters, ScopedQuery}},
    models::audit::{Audit, AuditChanges, AuditListRow, AuditResult, NewAudit, ResultInput},
};

pub(crate) const AUDIT_LIST_SELECT: &str = r#"
    SELECT a.*,
           l.name AS location_name,
           t.name AS template_name,
           NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), '') AS inspector_name
    FROM audits a
    JOIN locations l ON l.id = a.location_id
    JOIN audit_templates t ON t.id = a.template_id
    LEFT JOIN users u ON u.id = a.inspector_id"#;

#[derive(Clone, Copy, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &AuditFilters,
    ) -> Result<Vec<AuditListRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(AUDIT_LIST_SELECT, "a.organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY a.audit_date DESC, a.created_at DESC", None);

        let audits = qb.build_query_as::<AuditListRow>().fetch_all(executor).await?;
        Ok(audits)
    }

    pub async fn find_row<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AuditListRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{AUDIT_LIST_SELECT} WHERE a.id = $1 AND a.organization_id = $2");
        let row = sqlx::query_as::<_, AuditListRow>(&sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Locks the row for the rest of the transaction.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Audit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let audit = sqlx::query_as::<_, Audit>(
            "SELECT * FROM audits WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(audit)
    }

    pub async fn results<'e, E>(&self, executor: E, audit_id: Uuid) -> Result<Vec<AuditResult>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let results = sqlx::query_as::<_, AuditResult>(
            r#"
            SELECT r.id, r.audit_id, r.item_id, r.passed, r.notes, r.created_at
            FROM audit_results r
            JOIN template_items i ON i.id = r.item_id
            WHERE r.audit_id = $1
            ORDER BY i.position
            "#,
        )
        .bind(audit_id)
        .fetch_all(executor)
        .await?;
        Ok(results)
    }

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, new: &NewAudit) -> Result<Audit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let audit = sqlx::query_as::<_, Audit>(
            r#"
            INSERT INTO audits (organization_id, location_id, template_id, inspector_id, audit_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(new.location_id)
        .bind(new.template_id)
        .bind(new.inspector_id)
        .bind(new.audit_date)
        .bind(&new.notes)
        .fetch_one(executor)
        .await?;
        Ok(audit)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        changes: &AuditChanges,
    ) -> Result<Option<Audit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let audit = sqlx::query_as::<_, Audit>(
            r#"
            UPDATE audits
            SET status = COALESCE($3, status),
                audit_date = COALESCE($4, audit_date),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(changes.status)
        .bind(changes.audit_date)
        .bind(&changes.notes)
        .fetch_optional(executor)
        .await?;
        Ok(audit)
    }

    pub async fn clear_results<'e, E>(&self, executor: E, audit_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM audit_results WHERE audit_id = $1")
            .bind(audit_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_result<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        audit_id: Uuid,
        result: &ResultInput,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_results (organization_id, audit_id, item_id, passed, notes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(organization_id)
        .bind(audit_id)
        .bind(result.item_id)
        .bind(result.passed)
        .bind(&result.notes)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_db(e, "audit result"))?;
        Ok(())
    }

    pub async fn mark_completed<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        pass_percentage: Decimal,
        passed: bool,
    ) -> Result<Audit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let audit = sqlx::query_as::<_, Audit>(
            r#"
            UPDATE audits
            SET status = 'completed', pass_percentage = $3, passed = $4,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(pass_percentage)
        .bind(passed)
        .fetch_one(executor)
        .await?;
        Ok(audit)
    }

    /// Results and photos cascade with the audit.
    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM audits WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::audit::AuditStatus, services::audit_service::AuditService};
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    #[sqlx::test]
    async fn listing_never_crosses_organizations(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org_a = fixtures::organization(&pool, "org_a").await;
        let org_b = fixtures::organization(&pool, "org_b").await;
        for org in [org_a, org_a, org_b] {
            let location = fixtures::location(&pool, org, "Main kitchen").await;
            let (template, _) = fixtures::template(&pool, org, 1).await;
            fixtures::audit(&pool, org, location, template, AuditStatus::Draft).await;
        }

        let rows = AuditRepository.list(&pool, org_a, &AuditFilters::default()).await?;

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.audit.organization_id == org_a));
        Ok(())
    }

    #[sqlx::test]
    async fn status_and_location_filters_combine(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let kitchen = fixtures::location(&pool, org, "Main kitchen").await;
        let bar = fixtures::location(&pool, org, "Bar").await;
        let (template, _) = fixtures::template(&pool, org, 1).await;

        for _ in 0..3 {
            fixtures::audit(&pool, org, kitchen, template, AuditStatus::Completed).await;
        }
        fixtures::audit(&pool, org, kitchen, template, AuditStatus::Draft).await;
        fixtures::audit(&pool, org, bar, template, AuditStatus::Completed).await;

        let other_org = fixtures::organization(&pool, "org_b").await;
        let other_location = fixtures::location(&pool, other_org, "Main kitchen").await;
        let (other_template, _) = fixtures::template(&pool, other_org, 1).await;
        fixtures::audit(&pool, other_org, other_location, other_template, AuditStatus::Completed).await;

        let filters = AuditFilters {
            status: Some("completed".into()),
            location: Some(kitchen.to_string()),
            ..Default::default()
        };
        let rows = AuditRepository.list(&pool, org, &filters).await?;

        assert_eq!(rows.len(), 3);
        assert!(rows
            .iter()
            .all(|row| row.audit.status == AuditStatus::Completed && row.audit.location_id == kitchen));
        Ok(())
    }

    #[sqlx::test]
    async fn deleting_an_audit_takes_its_results(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org = fixtures::organization(&pool, "org_a").await;
        let location = fixtures::location(&pool, org, "Main kitchen").await;
        let (template, items) = fixtures::template(&pool, org, 2).await;
        let audit_id = fixtures::audit(&pool, org, location, template, AuditStatus::InProgress).await;

        let results: Vec<ResultInput> = items
            .iter()
            .map(|&item_id| ResultInput { item_id, passed: Some(true), notes: None })
            .collect();
        let mut conn = pool.acquire().await?;
        AuditService::new().complete(&mut *conn, org, audit_id, &results).await?;
        assert_eq!(AuditRepository.results(&mut *conn, audit_id).await?.len(), 2);

        assert!(AuditRepository.delete(&mut *conn, org, audit_id).await?);

        assert!(AuditRepository.find_row(&mut *conn, org, audit_id).await?.is_none());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_results WHERE audit_id = $1")
            .bind(audit_id)
            .fetch_one(&mut *conn)
            .await?;
        assert_eq!(orphans, 0);
        Ok(())
    }

    #[sqlx::test]
    async fn deleting_from_another_organization_is_a_no_op(options: PgPoolOptions, connect: PgConnectOptions) -> Result<(), AppError> {
        let pool = fixtures::pool(options, connect).await;
        let org_a = fixtures::organization(&pool, "org_a").await;
        let org_b = fixtures::organization(&pool, "org_b").await;
        let location = fixtures::location(&pool, org_a, "Main kitchen").await;
        let (template, _) = fixtures::template(&pool, org_a, 1).await;
        let audit_id = fixtures::audit(&pool, org_a, location, template, AuditStatus::Draft).await;

        assert!(!AuditRepository.delete(&pool, org_b, audit_id).await?);
        assert!(AuditRepository.find_row(&pool, org_a, audit_id).await?.is_some());
        Ok(())
    }
}
