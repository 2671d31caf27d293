// src/common/filters.rs

//! Query filter composition.
//!
//! Every list query starts scoped to the caller's organization; the optional
//! filters are appended only when the user actually supplied a value. The
//! sentinel `all` (what the UI sends for "no filter") counts as absent.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;
use uuid::Uuid;

pub const ALL: &str = "all";

/// Returns the filter value only when it is present, not blank and not `all`.
pub fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

/// `%term%` for ILIKE, with LIKE metacharacters escaped so they match literally.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            // dateFrom/dateTo sometimes arrive as full ISO timestamps
            value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "passed" => Some(true),
        "false" | "0" | "no" | "failed" => Some(false),
        _ => None,
    }
}

// ---
// The composer
// ---
pub struct ScopedQuery {
    builder: QueryBuilder<'static, Postgres>,
}

impl ScopedQuery {
    /// `select` must end right before the WHERE clause.
    pub fn new(select: &str, org_column: &str, organization_id: Uuid) -> Self {
        let mut builder = QueryBuilder::new(select);
        builder.push(" WHERE ");
        builder.push(org_column);
        builder.push(" = ");
        builder.push_bind(organization_id);
        Self { builder }
    }

    pub fn eq_text(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.builder.push(" AND ");
            self.builder.push(column);
            self.builder.push("::text = ");
            self.builder.push_bind(v.to_string());
        }
        self
    }

    /// A value that is not a uuid can never match; the query stays valid but returns nothing.
    pub fn eq_uuid(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            match Uuid::parse_str(v) {
                Ok(id) => {
                    self.builder.push(" AND ");
                    self.builder.push(column);
                    self.builder.push(" = ");
                    self.builder.push_bind(id);
                }
                Err(_) => {
                    tracing::debug!("Ignoring malformed id filter '{}' on {}", v, column);
                    self.builder.push(" AND FALSE");
                }
            }
        }
        self
    }

    pub fn eq_bool(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(b) = value.and_then(parse_bool) {
            self.builder.push(" AND ");
            self.builder.push(column);
            self.builder.push(" = ");
            self.builder.push_bind(b);
        }
        self
    }

    pub fn date_from(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(d) = value.and_then(parse_date) {
            self.builder.push(" AND ");
            self.builder.push(column);
            self.builder.push(" >= ");
            self.builder.push_bind(d);
        }
        self
    }

    pub fn date_to(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(d) = value.and_then(parse_date) {
            self.builder.push(" AND ");
            self.builder.push(column);
            self.builder.push(" <= ");
            self.builder.push_bind(d);
        }
        self
    }

    /// Case-insensitive substring match OR'ed across `columns`.
    pub fn search_any(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        if let Some(t) = term {
            if columns.is_empty() {
                return self;
            }
            let pattern = contains_pattern(t);
            self.builder.push(" AND (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    self.builder.push(" OR ");
                }
                self.builder.push(*column);
                self.builder.push(" ILIKE ");
                self.builder.push_bind(pattern.clone());
            }
            self.builder.push(")");
        }
        self
    }

    /// Raw fragment for conditions that take no user input.
    pub fn push_condition(&mut self, sql: &str) -> &mut Self {
        self.builder.push(" AND ");
        self.builder.push(sql);
        self
    }

    pub fn finish(mut self, tail: &str, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
        self.builder.push(" ");
        self.builder.push(tail);
        if let Some(limit) = limit {
            self.builder.push(" LIMIT ");
            self.builder.push_bind(limit);
        }
        self.builder
    }
}

// =============================================================================
//  Filter parameters (query string)
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditFilters {
    /// draft | in_progress | completed | cancelled | all
    pub status: Option<String>,
    /// Location id
    pub location: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    /// true | false | all
    pub passed: Option<String>,
}

impl AuditFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        q.eq_text("a.status", active(&self.status))
            .eq_uuid("a.location_id", active(&self.location))
            .date_from("a.audit_date", active(&self.date_from))
            .date_to("a.audit_date", active(&self.date_to))
            .search_any(&["l.name", "t.name", "a.notes"], active(&self.search))
            .eq_bool("a.passed", active(&self.passed));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ActionFilters {
    pub status: Option<String>,
    pub urgency: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub assigned_to: Option<String>,
}

impl ActionFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        q.eq_text("ac.status", active(&self.status))
            .eq_text("ac.urgency", active(&self.urgency))
            .eq_uuid("ac.location_id", active(&self.location))
            .eq_uuid("ac.assigned_to", active(&self.assigned_to))
            .search_any(&["ac.title", "ac.description"], active(&self.search));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LocationFilters {
    /// active | inactive | all
    pub status: Option<String>,
    pub search: Option<String>,
}

impl LocationFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        q.eq_text("status", active(&self.status))
            .search_any(&["name", "city", "address"], active(&self.search));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TemplateFilters {
    pub active: Option<String>,
    pub search: Option<String>,
}

impl TemplateFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        q.eq_bool("is_active", active(&self.active))
            .search_any(&["name", "description"], active(&self.search));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ScheduleFilters {
    pub active: Option<String>,
    pub location: Option<String>,
    pub recurrence: Option<String>,
}

impl ScheduleFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        q.eq_bool("s.is_active", active(&self.active))
            .eq_uuid("s.location_id", active(&self.location))
            .eq_text("s.recurrence", active(&self.recurrence));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AlertFilters {
    /// true returns only unread alerts
    pub unread: Option<String>,
    pub severity: Option<String>,
}

impl AlertFilters {
    pub fn apply(&self, q: &mut ScopedQuery) {
        if active(&self.unread).and_then(parse_bool) == Some(true) {
            q.push_condition("is_read = FALSE");
        }
        q.eq_text("severity", active(&self.severity));
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsFilters {
    pub location: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl AnalyticsFilters {
    pub fn apply(&self, q: &mut ScopedQuery, location_column: &str, date_column: &str) {
        q.eq_uuid(location_column, active(&self.location))
            .date_from(date_column, active(&self.date_from))
            .date_to(date_column, active(&self.date_to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUDIT_SELECT: &str = "SELECT a.* FROM audits a JOIN locations l ON l.id = a.location_id JOIN audit_templates t ON t.id = a.template_id";

    fn org() -> Uuid {
        Uuid::parse_str("8d3c2f0e-1111-4222-8333-944455556666").unwrap()
    }

    #[test]
    fn sentinel_and_blank_values_are_inactive() {
        assert_eq!(active(&None), None);
        assert_eq!(active(&Some("all".into())), None);
        assert_eq!(active(&Some("ALL".into())), None);
        assert_eq!(active(&Some("   ".into())), None);
        assert_eq!(active(&Some(" completed ".into())), Some("completed"));
    }

    #[test]
    fn pattern_escapes_like_metacharacters() {
        assert_eq!(contains_pattern("kitchen"), "%kitchen%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn parses_dates_and_bools() {
        assert_eq!(parse_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("2024-03-01T10:00:00Z"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn no_filters_only_scope_by_organization() {
        let mut q = ScopedQuery::new(AUDIT_SELECT, "a.organization_id", org());
        AuditFilters::default().apply(&mut q);
        let qb = q.finish("ORDER BY a.audit_date DESC", None);

        assert_eq!(
            qb.sql(),
            format!("{AUDIT_SELECT} WHERE a.organization_id = $1 ORDER BY a.audit_date DESC")
        );
    }

    #[test]
    fn status_and_location_filters_are_anded_after_the_tenant_scope() {
        let filters = AuditFilters {
            status: Some("completed".into()),
            location: Some("5b0e7a52-8a0f-4c1e-9d55-0c6a0d1e2f33".into()),
            ..Default::default()
        };
        let mut q = ScopedQuery::new(AUDIT_SELECT, "a.organization_id", org());
        filters.apply(&mut q);
        let qb = q.finish("ORDER BY a.audit_date DESC", Some(50));

        assert_eq!(
            qb.sql(),
            format!(
                "{AUDIT_SELECT} WHERE a.organization_id = $1 AND a.status::text = $2 \
                 AND a.location_id = $3 ORDER BY a.audit_date DESC LIMIT $4"
            )
        );
    }

    #[test]
    fn all_sentinels_add_nothing() {
        let filters = AuditFilters {
            status: Some("all".into()),
            location: Some("all".into()),
            passed: Some("all".into()),
            search: Some("".into()),
            ..Default::default()
        };
        let mut q = ScopedQuery::new(AUDIT_SELECT, "a.organization_id", org());
        filters.apply(&mut q);
        assert!(!q.finish("", None).sql().contains(" AND "));
    }

    #[test]
    fn non_uuid_location_matches_nothing() {
        let filters = AuditFilters { location: Some("kitchen-2".into()), ..Default::default() };
        let mut q = ScopedQuery::new(AUDIT_SELECT, "a.organization_id", org());
        filters.apply(&mut q);
        assert!(q.finish("", None).sql().contains("WHERE a.organization_id = $1 AND FALSE"));
    }

    #[test]
    fn search_ors_across_columns_and_dates_bound_the_range() {
        let filters = AuditFilters {
            search: Some("bar".into()),
            date_from: Some("2024-01-01".into()),
            date_to: Some("2024-01-31".into()),
            passed: Some("false".into()),
            ..Default::default()
        };
        let mut q = ScopedQuery::new(AUDIT_SELECT, "a.organization_id", org());
        filters.apply(&mut q);
        let sql = q.finish("", None).sql().to_string();

        assert!(sql.contains("a.audit_date >= $2 AND a.audit_date <= $3"));
        assert!(sql.contains("AND (l.name ILIKE $4 OR t.name ILIKE $5 OR a.notes ILIKE $6)"));
        assert!(sql.contains("a.passed = $7"));
    }

    #[test]
    fn unread_alert_filter_is_a_fixed_condition() {
        let filters = AlertFilters { unread: Some("true".into()), severity: Some("high".into()) };
        let mut q = ScopedQuery::new("SELECT * FROM alerts", "organization_id", org());
        filters.apply(&mut q);
        assert_eq!(
            q.finish("ORDER BY created_at DESC", None).sql(),
            "SELECT * FROM alerts WHERE organization_id = $1 AND is_read = FALSE \
             AND severity::text = $2 ORDER BY created_at DESC"
        );
    }
}
