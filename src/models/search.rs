// src/models/search.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Audit,
    Action,
    Location,
    Template,
}

impl SearchKind {
    pub fn href(self, id: Uuid) -> String {
        let section = match self {
            SearchKind::Audit => "audits",
            SearchKind::Action => "actions",
            SearchKind::Location => "locations",
            SearchKind::Template => "templates",
        };
        format!("/dashboard/{}/{}", section, id)
    }
}

/// Row shape every per-kind search query projects into.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SearchRow {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub kind: SearchKind,
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub href: String,
}

impl SearchHit {
    pub fn new(kind: SearchKind, row: SearchRow) -> Self {
        SearchHit {
            kind,
            href: kind.href(row.id),
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
        }
    }
}
