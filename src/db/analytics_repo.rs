// src/db/analytics_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{AnalyticsFilters, ScopedQuery}},
    models::analytics::{ActionStatusCount, AuditSummary, LocationBreakdown},
};

const SUMMARY_SELECT: &str = r#"
    SELECT COUNT(*) AS total_audits,
           COUNT(*) FILTER (WHERE a.status = 'completed') AS completed_audits,
           COUNT(*) FILTER (WHERE a.status = 'completed' AND a.passed) AS passed_audits,
           ROUND(100.0 * COUNT(*) FILTER (WHERE a.status = 'completed' AND a.passed)
                 / NULLIF(COUNT(*) FILTER (WHERE a.status = 'completed'), 0), 2) AS pass_rate,
           ROUND(AVG(a.pass_percentage) FILTER (WHERE a.status = 'completed'), 2) AS average_score
    FROM audits a"#;

const BY_LOCATION_SELECT: &str = r#"
    SELECT l.id AS location_id,
           l.name AS location_name,
           COUNT(a.id) AS total_audits,
           COUNT(a.id) FILTER (WHERE a.passed) AS passed_audits,
           ROUND(AVG(a.pass_percentage), 2) AS average_score
    FROM audits a
    JOIN locations l ON l.id = a.location_id"#;

const ACTIONS_SELECT: &str = "SELECT ac.status::text AS status, COUNT(*) AS count FROM actions ac";

#[derive(Clone, Copy, Default)]
pub struct AnalyticsRepository;

impl AnalyticsRepository {
    pub async fn summary<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &AnalyticsFilters,
    ) -> Result<AuditSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(SUMMARY_SELECT, "a.organization_id", organization_id);
        filters.apply(&mut q, "a.location_id", "a.audit_date");
        let mut qb = q.finish("", None);

        let summary = qb.build_query_as::<AuditSummary>().fetch_one(executor).await?;
        Ok(summary)
    }

    pub async fn by_location<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &AnalyticsFilters,
    ) -> Result<Vec<LocationBreakdown>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(BY_LOCATION_SELECT, "a.organization_id", organization_id);
        filters.apply(&mut q, "a.location_id", "a.audit_date");
        let mut qb = q.finish("GROUP BY l.id, l.name ORDER BY l.name", None);

        let rows = qb.build_query_as::<LocationBreakdown>().fetch_all(executor).await?;
        Ok(rows)
    }

    pub async fn actions_by_status<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &AnalyticsFilters,
    ) -> Result<Vec<ActionStatusCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new(ACTIONS_SELECT, "ac.organization_id", organization_id);
        filters.apply(&mut q, "ac.location_id", "ac.created_at::date");
        let mut qb = q.finish("GROUP BY ac.status ORDER BY ac.status", None);

        let rows = qb.build_query_as::<ActionStatusCount>().fetch_all(executor).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_counts_are_filtered_by_creation_date() {
        let filters = AnalyticsFilters {
            location: None,
            date_from: Some("2024-01-01".into()),
            date_to: None,
        };
        let mut q = ScopedQuery::new(ACTIONS_SELECT, "ac.organization_id", Uuid::nil());
        filters.apply(&mut q, "ac.location_id", "ac.created_at::date");
        let qb = q.finish("GROUP BY ac.status ORDER BY ac.status", None);

        assert!(qb.sql().ends_with(
            "WHERE ac.organization_id = $1 AND ac.created_at::date >= $2 GROUP BY ac.status ORDER BY ac.status"
        ));
    }
}
