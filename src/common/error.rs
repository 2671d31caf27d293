// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Internal error type. Handlers convert it into an ApiError (localized) at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Malformed request body: {0}")]
    InvalidPayload(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Role '{0}' required")]
    Forbidden(&'static str),

    // The payload is the i18n key of the message shown to the user.
    #[error("Not the owner: {0}")]
    NotOwner(&'static str),

    #[error("No active organization in session")]
    NoActiveOrganization,

    #[error("Organization not mirrored yet")]
    OrganizationNotFound,

    #[error("Store not configured")]
    StoreNotConfigured,

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    // The payload is the i18n key of the message shown to the user.
    #[error("Conflict: {0}")]
    Conflict(&'static str),

    #[error("Unique constraint violated: {0}")]
    UniqueConstraintViolation(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(&'static str),

    #[error("Photo storage not configured")]
    StorageNotConfigured,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Identity provider not configured")]
    IdentityProviderNotConfigured,

    #[error("Identity provider error: {0}")]
    IdentityProviderError(String),

    #[error("Webhook secret not configured")]
    WebhookNotConfigured,

    #[error("Invalid webhook: {0}")]
    InvalidWebhook(&'static str),

    // A foreign key pointed outside the tenant or at nothing; the payload is the constraint name.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_foreign_key_violation() {
                return AppError::InvalidReference(db_err.constraint().unwrap_or_default().to_string());
            }
        }
        AppError::DatabaseError(e)
    }
}

impl AppError {
    /// Maps a unique violation to a friendlier error, keeping everything else as a DB error.
    pub fn from_db(e: sqlx::Error, what: &str) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::UniqueConstraintViolation(what.to_string());
            }
        }
        AppError::from(e)
    }

    /// A single-field validation failure raised after the payload itself passed `validate()`.
    pub fn field(field: &'static str, code: &'static str, message_key: &'static str) -> Self {
        let mut error = validator::ValidationError::new(code);
        error.message = Some(message_key.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }

    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "errors.validation"),
            AppError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, "errors.invalid_payload"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "errors.unauthenticated"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "errors.invalid_token"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "errors.forbidden"),
            AppError::NotOwner(key) => (StatusCode::FORBIDDEN, *key),
            AppError::NoActiveOrganization => (StatusCode::FORBIDDEN, "errors.no_active_organization"),
            AppError::OrganizationNotFound => (StatusCode::NOT_FOUND, "errors.organization_not_found"),
            AppError::StoreNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "errors.store_not_configured"),
            AppError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "errors.not_found"),
            AppError::Conflict(key) => (StatusCode::CONFLICT, *key),
            AppError::UniqueConstraintViolation(_) => (StatusCode::CONFLICT, "errors.duplicate"),
            AppError::InvalidReference(_) => (StatusCode::BAD_REQUEST, "errors.invalid_reference"),
            AppError::InvalidUpload(key) => (StatusCode::BAD_REQUEST, *key),
            AppError::StorageNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "errors.storage_not_configured"),
            AppError::StorageError(_) => (StatusCode::BAD_GATEWAY, "errors.storage"),
            AppError::IdentityProviderNotConfigured => {
                (StatusCode::INTERNAL_SERVER_ERROR, "errors.identity_provider_not_configured")
            }
            AppError::IdentityProviderError(_) | AppError::HttpClientError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "errors.identity_provider")
            }
            AppError::WebhookNotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "errors.webhook.not_configured"),
            AppError::InvalidWebhook(key) => (StatusCode::BAD_REQUEST, *key),
            AppError::JwtError(_) => (StatusCode::UNAUTHORIZED, "errors.invalid_token"),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "errors.internal")
            }
        }
    }

    /// Converts into the public error shape, translating messages to the caller's locale.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key) = self.status_and_key();
        let error = store.translate(&locale.0, key);

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => store.translate(&locale.0, m),
                            None => store.translate(&locale.0, &format!("validation.{}", e.code)),
                        })
                        .collect();
                    fields.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(fields))
            }
            AppError::Forbidden(role) => Some(json!({ "requiredRole": role })),
            AppError::ResourceNotFound(what) => Some(json!({ "resource": what })),
            _ => None,
        };

        ApiError { status, error, details }
    }
}

/// The `{ success: false, error }` half of the action result contract.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn en() -> (Locale, I18nStore) {
        (Locale("en".into()), I18nStore::load("en").unwrap())
    }

    #[test]
    fn maps_upload_errors_to_their_messages() {
        let (locale, store) = en();
        let api = AppError::InvalidUpload("errors.upload.not_image").to_api_error(&locale, &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "Only image files are allowed");
    }

    #[test]
    fn validation_details_are_keyed_by_field() {
        let (locale, store) = en();
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("validation.required".into());
        errors.add("name", err);

        let api = AppError::ValidationError(errors).to_api_error(&locale, &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["name"][0], "This field is required.");
    }

    #[test]
    fn field_errors_carry_their_message_key() {
        let (locale, store) = en();
        let api = AppError::field("locationId", "invalid_reference", "validation.invalid_reference")
            .to_api_error(&locale, &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["locationId"][0], "No such record in this organization.");
    }

    #[test]
    fn dangling_references_are_client_errors() {
        let (locale, store) = en();
        let api = AppError::InvalidReference("audits_location_id_fkey".into()).to_api_error(&locale, &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "A referenced record does not exist in this organization.");
    }

    #[test]
    fn store_not_configured_is_service_unavailable() {
        let (locale, store) = en();
        let api = AppError::StoreNotConfigured.to_api_error(&locale, &store);
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn renders_failure_shape() {
        use http_body_util::BodyExt;

        let response = ApiError::new(StatusCode::CONFLICT, "nope")
            .with_details(json!({ "x": 1 }))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nope");
        assert_eq!(body["details"]["x"], 1);
    }
}
