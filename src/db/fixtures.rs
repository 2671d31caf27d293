// src/db/fixtures.rs

//! Rows for store-backed tests. Inserts go straight to the tables on a pool
//! that bypasses the tenant policies, like the service connection does.

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use uuid::Uuid;

use crate::models::audit::AuditStatus;

/// Seeding several organizations needs the policies out of the way.
pub(crate) async fn pool(options: PgPoolOptions, connect: PgConnectOptions) -> PgPool {
    options
        .connect_with(connect.options([("app.bypass_rls", "on")]))
        .await
        .unwrap()
}

pub(crate) async fn organization(pool: &PgPool, external_id: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO organizations (external_id, name) VALUES ($1, $1) RETURNING id")
        .bind(external_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub(crate) async fn location(pool: &PgPool, organization_id: Uuid, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO locations (organization_id, name) VALUES ($1, $2) RETURNING id")
        .bind(organization_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A template with one category holding `items` checklist items.
pub(crate) async fn template(pool: &PgPool, organization_id: Uuid, items: usize) -> (Uuid, Vec<Uuid>) {
    let template_id: Uuid =
        sqlx::query_scalar("INSERT INTO audit_templates (organization_id, name) VALUES ($1, 'Kitchen hygiene') RETURNING id")
            .bind(organization_id)
            .fetch_one(pool)
            .await
            .unwrap();

    let category_id: Uuid = sqlx::query_scalar(
        "INSERT INTO template_categories (organization_id, template_id, name) VALUES ($1, $2, 'Storage') RETURNING id",
    )
    .bind(organization_id)
    .bind(template_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let mut item_ids = Vec::with_capacity(items);
    for position in 0..items {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO template_items (organization_id, template_id, category_id, label, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(template_id)
        .bind(category_id)
        .bind(format!("Item {}", position + 1))
        .bind(position as i32)
        .fetch_one(pool)
        .await
        .unwrap();
        item_ids.push(id);
    }

    (template_id, item_ids)
}

pub(crate) async fn audit(
    pool: &PgPool,
    organization_id: Uuid,
    location_id: Uuid,
    template_id: Uuid,
    status: AuditStatus,
) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO audits (organization_id, location_id, template_id, status) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(organization_id)
    .bind(location_id)
    .bind(template_id)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}
