use axum::{
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

pub mod actions;
pub mod alerts;
pub mod analytics;
pub mod audits;
pub mod comments;
pub mod locations;
pub mod notifications;
pub mod photos;
pub mod scan;
pub mod schedules;
pub mod search;
pub mod session;
pub mod sync;
pub mod templates;
pub mod webhooks;

/// JSON body that has already passed its `validator` rules. Both malformed
/// JSON and rule violations reject with the localized 400 shape.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let Ok(locale) = Locale::from_request_parts(&mut parts, state).await;
        let app_state = AppState::from_ref(state);

        let Json(payload) = Json::<T>::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| {
                AppError::InvalidPayload(rejection.body_text()).to_api_error(&locale, &app_state.i18n_store)
            })?;

        payload
            .validate()
            .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

        Ok(ValidatedJson(payload))
    }
}
