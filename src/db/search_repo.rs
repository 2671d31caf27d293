// src/db/search_repo.rs

//! One query per searchable entity, each projecting into `SearchRow`.

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::ScopedQuery},
    models::search::SearchRow,
};

const AUDIT_SEARCH_SELECT: &str = r#"
    SELECT a.id,
           CONCAT(l.name, ' - ', t.name) AS title,
           a.status::text AS subtitle
    FROM audits a
    JOIN locations l ON l.id = a.location_id
    JOIN audit_templates t ON t.id = a.template_id"#;

#[derive(Clone, Copy, Default)]
pub struct SearchRepository;

impl SearchRepository {
    pub(crate) fn audits_by_status_query(organization_id: Uuid, term: &str, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut q = ScopedQuery::new(AUDIT_SEARCH_SELECT, "a.organization_id", organization_id);
        q.search_any(&["a.status::text"], Some(term));
        q.finish("ORDER BY a.audit_date DESC", Some(limit))
    }

    pub(crate) fn audits_by_location_query(organization_id: Uuid, term: &str, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut q = ScopedQuery::new(AUDIT_SEARCH_SELECT, "a.organization_id", organization_id);
        q.search_any(&["l.name"], Some(term));
        q.finish("ORDER BY a.audit_date DESC", Some(limit))
    }

    pub(crate) fn actions_query(organization_id: Uuid, term: &str, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut q = ScopedQuery::new(
            "SELECT ac.id, ac.title AS title, ac.status::text AS subtitle FROM actions ac",
            "ac.organization_id",
            organization_id,
        );
        q.search_any(&["ac.title", "ac.description"], Some(term));
        q.finish("ORDER BY ac.created_at DESC", Some(limit))
    }

    pub(crate) fn locations_query(organization_id: Uuid, term: &str, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut q = ScopedQuery::new(
            "SELECT id, name AS title, city AS subtitle FROM locations",
            "organization_id",
            organization_id,
        );
        q.search_any(&["name", "city", "address"], Some(term));
        q.finish("ORDER BY name ASC", Some(limit))
    }

    pub(crate) fn templates_query(organization_id: Uuid, term: &str, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut q = ScopedQuery::new(
            "SELECT id, name AS title, description AS subtitle FROM audit_templates",
            "organization_id",
            organization_id,
        );
        q.search_any(&["name", "description"], Some(term));
        q.finish("ORDER BY name ASC", Some(limit))
    }

    pub async fn fetch<'e, E>(&self, executor: E, mut query: QueryBuilder<'static, Postgres>) -> Result<Vec<SearchRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = query.build_query_as::<SearchRow>().fetch_all(executor).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_queries_split_direct_and_joined_matches() {
        let org = Uuid::nil();
        let by_status = SearchRepository::audits_by_status_query(org, "compl", 5);
        let by_location = SearchRepository::audits_by_location_query(org, "compl", 5);

        assert!(by_status.sql().contains("WHERE a.organization_id = $1 AND (a.status::text ILIKE $2)"));
        assert!(by_location.sql().contains("WHERE a.organization_id = $1 AND (l.name ILIKE $2)"));
        assert!(by_status.sql().ends_with("LIMIT $3"));
    }

    #[test]
    fn location_search_ors_three_columns() {
        let sql = SearchRepository::locations_query(Uuid::nil(), "lisbon", 5).sql().to_string();
        assert!(sql.contains("(name ILIKE $2 OR city ILIKE $3 OR address ILIKE $4)"));
    }
}
