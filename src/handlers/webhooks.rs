// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ActionResponse,
    },
    config::AppState,
    middleware::i18n::Locale,
    services::webhook_service::{
        dispatch, WebhookEvent, WebhookVerifier, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
    },
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

async fn process(app_state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let secret = app_state
        .settings
        .clerk_webhook_secret
        .as_deref()
        .ok_or(AppError::WebhookNotConfigured)?;

    let (Some(id), Some(timestamp), Some(signature)) = (
        header(headers, HEADER_ID),
        header(headers, HEADER_TIMESTAMP),
        header(headers, HEADER_SIGNATURE),
    ) else {
        return Err(AppError::InvalidWebhook("errors.webhook.missing_headers"));
    };

    let verifier = WebhookVerifier::new(secret)?;
    verifier.verify(id, timestamp, signature, body, chrono::Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Webhook {} has an unreadable body: {}", id, e);
        AppError::InvalidWebhook("errors.webhook.invalid_payload")
    })?;

    match dispatch(app_state.identity_sync.as_ref(), event).await {
        Ok(_) => Ok(()),
        Err(e @ AppError::InvalidWebhook(_)) => Err(e),
        // the provider retries on any 5xx
        Err(e) => Err(AppError::InternalServerError(anyhow::anyhow!("webhook {} not applied: {}", id, e))),
    }
}

#[utoipa::path(
    post,
    path = "/api/webhooks/clerk",
    tag = "Webhooks",
    request_body(content = serde_json::Value, description = "Signed identity provider event `{ type, data }`"),
    responses(
        (status = 200, description = "Event applied, skipped or ignored"),
        (status = 400, description = "Missing svix headers, bad signature or unreadable payload"),
        (status = 500, description = "Secret not configured, or the mirror procedure failed")
    )
)]
pub async fn clerk_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    process(&app_state, &headers, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(ActionResponse::done())
}
