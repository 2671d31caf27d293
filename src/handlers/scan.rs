// src/handlers/scan.rs

//! Landing route printed into location QR codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{db_utils::get_service_connection, error::{ApiError, AppError}},
    config::AppState,
    db::{OrganizationRepository, ScanRepository},
    middleware::{auth::MaybeUser, i18n::Locale},
    models::{
        location::LocationStatus,
        scan::{ScanLogOutcome, ScanPage, ScanTarget},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Page(ScanPage),
    StartAudit(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanDecision {
    /// `None` when there is no location to attach the log row to.
    pub log: Option<ScanLogOutcome>,
    pub outcome: ScanOutcome,
}

pub fn decide_scan(target: Option<&ScanTarget>, authenticated: bool) -> ScanDecision {
    let Some(target) = target else {
        return ScanDecision { log: None, outcome: ScanOutcome::Page(ScanPage::InvalidToken) };
    };

    if !target.qr_enabled {
        return ScanDecision {
            log: Some(ScanLogOutcome::Disabled),
            outcome: ScanOutcome::Page(ScanPage::QrDisabled),
        };
    }

    let outcome = if target.status != LocationStatus::Active {
        ScanOutcome::Page(ScanPage::LocationInactive)
    } else if !authenticated {
        ScanOutcome::Page(ScanPage::SignInRequired)
    } else {
        ScanOutcome::StartAudit(target.id)
    };

    ScanDecision { log: Some(ScanLogOutcome::Success), outcome }
}

impl ScanPage {
    fn status(self) -> StatusCode {
        match self {
            ScanPage::InvalidToken => StatusCode::NOT_FOUND,
            ScanPage::QrDisabled => StatusCode::FORBIDDEN,
            ScanPage::LocationInactive => StatusCode::GONE,
            ScanPage::SignInRequired => StatusCode::UNAUTHORIZED,
        }
    }

    fn message_key(self) -> &'static str {
        match self {
            ScanPage::InvalidToken => "scan.invalid_token",
            ScanPage::QrDisabled => "scan.qr_disabled",
            ScanPage::LocationInactive => "scan.location_inactive",
            ScanPage::SignInRequired => "scan.sign_in_required",
        }
    }
}

pub fn sign_in_url(token: &str) -> String {
    format!("/sign-in?redirect_url=/scan/{}", token)
}

pub fn new_audit_url(locale: &str, location_id: Uuid) -> String {
    format!("/{}/dashboard/audits/new?location={}", locale, location_id)
}

async fn resolve(app_state: &AppState, token: &str, user: &MaybeUser) -> Result<ScanDecision, AppError> {
    let mut conn = get_service_connection(app_state).await?;

    let target = ScanRepository.find_by_token(&mut *conn, token).await?;
    let decision = decide_scan(target.as_ref(), user.0.is_some());

    if let (Some(target), Some(outcome)) = (target.as_ref(), decision.log) {
        let user_id = match &user.0 {
            Some(session) => OrganizationRepository.find_user_id(&mut *conn, &session.user_id).await?,
            None => None,
        };
        ScanRepository.log(&mut *conn, target, user_id, outcome).await?;
        conn.commit().await?;
        tracing::info!(location_id = %target.id, outcome = outcome.as_str(), "QR scan logged");
    }

    Ok(decision)
}

#[utoipa::path(
    get,
    path = "/scan/{token}",
    tag = "Locations",
    params(("token" = String, Path, description = "QR code token printed at the location")),
    responses(
        (status = 303, description = "Signed in: redirect to the new-audit page for the location"),
        (status = 401, description = "sign_in_required, with the sign-in URL to come back here"),
        (status = 403, description = "qr_disabled"),
        (status = 404, description = "invalid_token"),
        (status = 410, description = "location_inactive")
    )
)]
pub async fn scan(
    State(app_state): State<AppState>,
    locale: Locale,
    user: MaybeUser,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let decision = resolve(&app_state, &token, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let page = match decision.outcome {
        ScanOutcome::StartAudit(location_id) => {
            return Ok(Redirect::to(&new_audit_url(&locale.0, location_id)).into_response());
        }
        ScanOutcome::Page(page) => page,
    };

    let mut body = json!({
        "page": page,
        "message": app_state.i18n_store.translate(&locale.0, page.message_key()),
    });
    if page == ScanPage::SignInRequired {
        body["signInUrl"] = json!(sign_in_url(&token));
    }
    Ok((page.status(), Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(status: LocationStatus, qr_enabled: bool) -> ScanTarget {
        ScanTarget {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            name: "Main kitchen".into(),
            status,
            qr_enabled,
        }
    }

    #[test]
    fn unknown_tokens_are_not_logged() {
        let decision = decide_scan(None, true);
        assert_eq!(decision.log, None);
        assert_eq!(decision.outcome, ScanOutcome::Page(ScanPage::InvalidToken));
    }

    #[test]
    fn disabled_codes_win_over_everything_else() {
        let decision = decide_scan(Some(&target(LocationStatus::Inactive, false)), false);
        assert_eq!(decision.log, Some(ScanLogOutcome::Disabled));
        assert_eq!(decision.outcome, ScanOutcome::Page(ScanPage::QrDisabled));
    }

    #[test]
    fn inactive_locations_are_logged_as_successful_scans() {
        let decision = decide_scan(Some(&target(LocationStatus::Inactive, true)), true);
        assert_eq!(decision.log, Some(ScanLogOutcome::Success));
        assert_eq!(decision.outcome, ScanOutcome::Page(ScanPage::LocationInactive));
    }

    #[test]
    fn anonymous_scans_ask_for_sign_in() {
        let decision = decide_scan(Some(&target(LocationStatus::Active, true)), false);
        assert_eq!(decision.log, Some(ScanLogOutcome::Success));
        assert_eq!(decision.outcome, ScanOutcome::Page(ScanPage::SignInRequired));
        assert_eq!(sign_in_url("abc"), "/sign-in?redirect_url=/scan/abc");
    }

    #[test]
    fn signed_in_scans_start_an_audit() {
        let location = target(LocationStatus::Active, true);
        let decision = decide_scan(Some(&location), true);
        assert_eq!(decision.outcome, ScanOutcome::StartAudit(location.id));
        assert_eq!(
            new_audit_url("pt", location.id),
            format!("/pt/dashboard/audits/new?location={}", Uuid::nil())
        );
    }

    #[test]
    fn pages_map_to_distinct_statuses() {
        assert_eq!(ScanPage::InvalidToken.status(), StatusCode::NOT_FOUND);
        assert_eq!(ScanPage::QrDisabled.status(), StatusCode::FORBIDDEN);
        assert_eq!(ScanPage::LocationInactive.status(), StatusCode::GONE);
        assert_eq!(ScanPage::SignInRequired.status(), StatusCode::UNAUTHORIZED);
    }
}
