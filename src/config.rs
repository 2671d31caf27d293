// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    services::{
        audit_service::AuditService,
        auth::AuthService,
        identity_provider::IdentityProvider,
        identity_sync::{IdentitySync, PgIdentitySync},
        photo_service::{HttpObjectStorage, PhotoService, PhotoStorage, UnconfiguredStorage},
        schedule_service::ScheduleService,
        search_service::SearchService,
        template_service::TemplateService,
    },
};

const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";
const DEFAULT_BUCKET: &str = "audit-photos";

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub clerk_jwt_key: Option<String>,
    pub clerk_webhook_secret: Option<String>,
    pub clerk_secret_key: Option<String>,
    pub clerk_api_url: String,
    pub storage_url: Option<String>,
    pub storage_service_key: Option<String>,
    pub storage_bucket: String,
    pub bind_addr: String,
    pub default_locale: String,
    pub app_base_url: String,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS must be a number: {}", e))?,
            None => 5,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            database_max_connections,
            // PEM keys are often stored with escaped newlines
            clerk_jwt_key: var("CLERK_JWT_KEY").map(|k| k.replace("\\n", "\n")),
            clerk_webhook_secret: var("CLERK_WEBHOOK_SECRET"),
            clerk_secret_key: var("CLERK_SECRET_KEY"),
            clerk_api_url: var("CLERK_API_URL").unwrap_or_else(|| DEFAULT_CLERK_API_URL.to_string()),
            storage_url: var("STORAGE_URL"),
            storage_service_key: var("STORAGE_SERVICE_KEY"),
            storage_bucket: var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            default_locale: var("DEFAULT_LOCALE").unwrap_or_else(|| "en".to_string()),
            app_base_url: var("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}

#[cfg(test)]
impl Settings {
    fn empty() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            clerk_jwt_key: None,
            clerk_webhook_secret: None,
            clerk_secret_key: None,
            clerk_api_url: DEFAULT_CLERK_API_URL.to_string(),
            storage_url: None,
            storage_service_key: None,
            storage_bucket: DEFAULT_BUCKET.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            default_locale: "en".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// `None` when DATABASE_URL is unset: reads degrade, writes answer 503.
    pub db_pool: Option<PgPool>,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub identity_sync: Arc<dyn IdentitySync>,
    pub identity_provider: Option<IdentityProvider>,
    pub audit_service: AuditService,
    pub template_service: TemplateService,
    pub schedule_service: ScheduleService,
    pub search_service: SearchService,
    pub photo_service: PhotoService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        let db_pool = match settings.database_url.as_deref() {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(settings.database_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(url)
                    .await?;
                tracing::info!("Database connection established");
                Some(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL not set: running without a data store");
                None
            }
        };

        let i18n_store = I18nStore::load(&settings.default_locale)?;
        let auth_service = AuthService::from_pem(settings.clerk_jwt_key.as_deref())?;
        let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

        let storage: Arc<dyn PhotoStorage> = match (&settings.storage_url, &settings.storage_service_key) {
            (Some(url), Some(key)) => Arc::new(HttpObjectStorage::new(http.clone(), url, key, &settings.storage_bucket)),
            _ => {
                tracing::warn!("STORAGE_URL or STORAGE_SERVICE_KEY not set: photo uploads disabled");
                Arc::new(UnconfiguredStorage)
            }
        };

        let identity_provider = settings
            .clerk_secret_key
            .clone()
            .map(|key| IdentityProvider::new(http.clone(), &settings.clerk_api_url, key));

        if settings.clerk_webhook_secret.is_none() {
            tracing::warn!("CLERK_WEBHOOK_SECRET not set: webhooks will be rejected");
        }

        Ok(Self {
            identity_sync: Arc::new(PgIdentitySync::new(db_pool.clone())),
            db_pool,
            settings: Arc::new(settings),
            i18n_store: Arc::new(i18n_store),
            auth_service,
            identity_provider,
            audit_service: AuditService::new(),
            template_service: TemplateService::new(),
            schedule_service: ScheduleService::new(),
            search_service: SearchService::new(),
            photo_service: PhotoService::new(storage),
        })
    }
}

#[cfg(test)]
impl AppState {
    /// No store, no storage, HS256 tokens signed with the test secret.
    pub(crate) fn for_tests() -> Self {
        Self {
            db_pool: None,
            settings: Arc::new(Settings::empty()),
            i18n_store: Arc::new(I18nStore::load("en").unwrap()),
            auth_service: AuthService::from_secret(crate::services::auth::tests::TEST_SECRET),
            identity_sync: Arc::new(PgIdentitySync::new(None)),
            identity_provider: None,
            audit_service: AuditService::new(),
            template_service: TemplateService::new(),
            schedule_service: ScheduleService::new(),
            search_service: SearchService::new(),
            photo_service: PhotoService::new(Arc::new(UnconfiguredStorage)),
        }
    }

    pub(crate) fn with_webhook_secret(mut self, secret: &str) -> Self {
        Arc::make_mut(&mut self.settings).clerk_webhook_secret = Some(secret.to_string());
        self
    }

    pub(crate) fn with_identity_sync(mut self, sync: Arc<dyn IdentitySync>) -> Self {
        self.identity_sync = sync;
        self
    }
}
