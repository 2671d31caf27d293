// src/services/identity_sync.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::IdentityRepository,
    models::identity::UserRecord,
};

/// The mirror's write side. Implementations call one stored procedure per method.
#[async_trait]
pub trait IdentitySync: Send + Sync {
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError>;
    async fn delete_user(&self, external_id: &str) -> Result<(), AppError>;
    async fn upsert_organization(
        &self,
        external_id: &str,
        name: &str,
        slug: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<(), AppError>;
    async fn delete_organization(&self, external_id: &str) -> Result<(), AppError>;
    async fn upsert_membership(&self, external_org_id: &str, external_user_id: &str, role: &str) -> Result<(), AppError>;
    async fn delete_membership(&self, external_org_id: &str, external_user_id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgIdentitySync {
    pool: Option<PgPool>,
    repo: IdentityRepository,
}

impl PgIdentitySync {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool, repo: IdentityRepository }
    }

    fn pool(&self) -> Result<&PgPool, AppError> {
        self.pool.as_ref().ok_or(AppError::StoreNotConfigured)
    }
}

#[async_trait]
impl IdentitySync for PgIdentitySync {
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError> {
        self.repo.upsert_user(self.pool()?, user).await
    }

    async fn delete_user(&self, external_id: &str) -> Result<(), AppError> {
        self.repo.delete_user(self.pool()?, external_id).await
    }

    async fn upsert_organization(
        &self,
        external_id: &str,
        name: &str,
        slug: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<(), AppError> {
        self.repo
            .upsert_organization(self.pool()?, external_id, name, slug, image_url)
            .await
    }

    async fn delete_organization(&self, external_id: &str) -> Result<(), AppError> {
        self.repo.delete_organization(self.pool()?, external_id).await
    }

    async fn upsert_membership(&self, external_org_id: &str, external_user_id: &str, role: &str) -> Result<(), AppError> {
        self.repo
            .upsert_membership(self.pool()?, external_org_id, external_user_id, role)
            .await
    }

    async fn delete_membership(&self, external_org_id: &str, external_user_id: &str) -> Result<(), AppError> {
        self.repo
            .delete_membership(self.pool()?, external_org_id, external_user_id)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every procedure call instead of touching a database.
    #[derive(Default)]
    pub(crate) struct RecordingSync {
        pub calls: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingSync {
        pub fn failing() -> Self {
            Self { calls: Mutex::new(Vec::new()), fail: true }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(AppError::StoreNotConfigured)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl IdentitySync for RecordingSync {
        async fn upsert_user(&self, user: &UserRecord) -> Result<(), AppError> {
            self.record(format!("upsert_user:{}:{}", user.external_id, user.email))
        }
        async fn delete_user(&self, external_id: &str) -> Result<(), AppError> {
            self.record(format!("delete_user:{}", external_id))
        }
        async fn upsert_organization(
            &self,
            external_id: &str,
            name: &str,
            _slug: Option<&str>,
            _image_url: Option<&str>,
        ) -> Result<(), AppError> {
            self.record(format!("upsert_organization:{}:{}", external_id, name))
        }
        async fn delete_organization(&self, external_id: &str) -> Result<(), AppError> {
            self.record(format!("delete_organization:{}", external_id))
        }
        async fn upsert_membership(&self, org: &str, user: &str, role: &str) -> Result<(), AppError> {
            self.record(format!("upsert_membership:{}:{}:{}", org, user, role))
        }
        async fn delete_membership(&self, org: &str, user: &str) -> Result<(), AppError> {
            self.record(format!("delete_membership:{}:{}", org, user))
        }
    }

    #[tokio::test]
    async fn without_a_pool_every_call_fails() {
        let sync = PgIdentitySync::new(None);
        assert!(matches!(sync.delete_user("user_1").await, Err(AppError::StoreNotConfigured)));
    }
}
