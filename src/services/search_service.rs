// src/services/search_service.rs

use std::collections::HashSet;

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SearchRepository,
    models::search::{SearchHit, SearchKind, SearchRow},
};

pub const MIN_TERM_LEN: usize = 2;
pub const PER_KIND_LIMIT: usize = 5;

/// Trimmed term, or `None` when it is too short to search for.
pub fn normalize_term(raw: &str) -> Option<&str> {
    let term = raw.trim();
    (term.chars().count() >= MIN_TERM_LEN).then_some(term)
}

/// Union of two result sets by id: first-seen order, duplicates dropped.
pub fn merge_unique(first: Vec<SearchRow>, second: Vec<SearchRow>) -> Vec<SearchRow> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|row| seen.insert(row.id))
        .collect()
}

#[derive(Clone, Default)]
pub struct SearchService {
    search_repo: SearchRepository,
}

impl SearchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audits, then actions, locations and templates; at most five of each.
    pub async fn search<'e, E>(&self, executor: E, organization_id: Uuid, raw_term: &str) -> Result<Vec<SearchHit>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let Some(term) = normalize_term(raw_term) else {
            return Ok(Vec::new());
        };
        let limit = PER_KIND_LIMIT as i64;
        let mut tx = executor.begin().await?;

        // Status and location name live on different tables, so audits are
        // matched twice and merged.
        let by_status = self
            .search_repo
            .fetch(&mut *tx, SearchRepository::audits_by_status_query(organization_id, term, limit))
            .await?;
        let by_location = self
            .search_repo
            .fetch(&mut *tx, SearchRepository::audits_by_location_query(organization_id, term, limit))
            .await?;
        let mut audits = merge_unique(by_status, by_location);
        audits.truncate(PER_KIND_LIMIT);

        let actions = self
            .search_repo
            .fetch(&mut *tx, SearchRepository::actions_query(organization_id, term, limit))
            .await?;
        let locations = self
            .search_repo
            .fetch(&mut *tx, SearchRepository::locations_query(organization_id, term, limit))
            .await?;
        let templates = self
            .search_repo
            .fetch(&mut *tx, SearchRepository::templates_query(organization_id, term, limit))
            .await?;

        tx.commit().await?;
        Ok(assemble(vec![
            (SearchKind::Audit, audits),
            (SearchKind::Action, actions),
            (SearchKind::Location, locations),
            (SearchKind::Template, templates),
        ]))
    }
}

fn assemble(groups: Vec<(SearchKind, Vec<SearchRow>)>) -> Vec<SearchHit> {
    groups
        .into_iter()
        .flat_map(|(kind, rows)| {
            rows.into_iter()
                .take(PER_KIND_LIMIT)
                .map(move |row| SearchHit::new(kind, row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: u128) -> SearchRow {
        SearchRow { id: Uuid::from_u128(n), title: format!("row {n}"), subtitle: None }
    }

    #[test]
    fn short_terms_are_rejected() {
        assert_eq!(normalize_term(""), None);
        assert_eq!(normalize_term(" a "), None);
        assert_eq!(normalize_term(" ab "), Some("ab"));
        assert_eq!(normalize_term("é"), None);
    }

    #[test]
    fn merge_keeps_first_seen_order_and_every_row() {
        let merged = merge_unique(vec![row(3), row(1)], vec![row(1), row(2), row(3), row(4)]);
        let ids: Vec<u128> = merged.iter().map(|r| r.id.as_u128()).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
    }

    #[test]
    fn hits_are_grouped_in_kind_order_and_capped() {
        let hits = assemble(vec![
            (SearchKind::Audit, (0..8).map(row).collect()),
            (SearchKind::Action, vec![row(100)]),
            (SearchKind::Location, vec![]),
            (SearchKind::Template, vec![row(200)]),
        ]);

        assert_eq!(hits.len(), 7);
        assert!(hits[..5].iter().all(|h| h.kind == SearchKind::Audit));
        assert_eq!(hits[5].kind, SearchKind::Action);
        assert_eq!(hits[6].kind, SearchKind::Template);
        assert_eq!(hits[6].href, format!("/dashboard/templates/{}", Uuid::from_u128(200)));

        let unique: HashSet<(SearchKind, Uuid)> = hits.iter().map(|h| (h.kind, h.id)).collect();
        assert_eq!(unique.len(), hits.len());
    }
}
