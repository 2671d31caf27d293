// src/db/location_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, filters::{LocationFilters, ScopedQuery}},
    models::location::{Location, LocationFields, LocationStatus},
};

#[derive(Clone, Copy, Default)]
pub struct LocationRepository;

impl LocationRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filters: &LocationFilters,
    ) -> Result<Vec<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut q = ScopedQuery::new("SELECT * FROM locations", "organization_id", organization_id);
        filters.apply(&mut q);
        let mut qb = q.finish("ORDER BY name ASC", None);

        let locations = qb.build_query_as::<Location>().fetch_all(executor).await?;
        Ok(locations)
    }

    pub async fn find<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        fields: &LocationFields,
        qr_code_token: &str,
    ) -> Result<Location, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (organization_id, name, address, city, postal_code, country, qr_code_token, qr_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.postal_code)
        .bind(&fields.country)
        .bind(qr_code_token)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_db(e, "location"))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        fields: &LocationFields,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET name = $3, address = $4, city = $5, postal_code = $6, country = $7, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.postal_code)
        .bind(&fields.country)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        status: LocationStatus,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            "UPDATE locations SET status = $3, updated_at = NOW() WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }

    /// `new_token` replaces the token when given; `enabled` toggles scanning when given.
    pub async fn update_qr<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        new_token: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<Option<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET qr_code_token = COALESCE($3, qr_code_token),
                qr_enabled = COALESCE($4, qr_enabled),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(new_token)
        .bind(enabled)
        .fetch_optional(executor)
        .await?;
        Ok(location)
    }
}
