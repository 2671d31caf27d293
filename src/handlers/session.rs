// src/handlers/session.rs

use axum::{response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::ApiError,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{RoleRequirement, RoleState},
    },
};

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct NavEntry {
    pub label: &'static str,
    pub href: &'static str,
}

// label, href, role needed to see it
const NAVIGATION: &[(&str, &str, RoleRequirement)] = &[
    ("Dashboard", "/dashboard", RoleRequirement::Member),
    ("Audits", "/dashboard/audits", RoleRequirement::Member),
    ("Actions", "/dashboard/actions", RoleRequirement::Member),
    ("Scheduled", "/dashboard/scheduled", RoleRequirement::Admin),
    ("Locations", "/dashboard/locations", RoleRequirement::Admin),
    ("Templates", "/dashboard/templates", RoleRequirement::Admin),
    ("Analytics", "/dashboard/analytics", RoleRequirement::Member),
    ("Alerts", "/dashboard/alerts", RoleRequirement::Member),
];

pub fn visible_navigation(role: &RoleState) -> Vec<NavEntry> {
    NAVIGATION
        .iter()
        .filter(|(_, _, requirement)| role.satisfies(*requirement))
        .map(|(label, href, _)| NavEntry { label, href })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: String,
    pub org_id: Option<String>,
    pub org_slug: Option<String>,
    pub role: RoleState,
    pub navigation: Vec<NavEntry>,
}

#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Session",
    responses(
        (status = 200, description = "Caller's role in the active organization and the links it may see", body = SessionView),
        (status = 401, description = "Not signed in")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(AuthenticatedUser(session): AuthenticatedUser) -> Result<impl IntoResponse, ApiError> {
    let role = RoleState::from_session(Some(&session));

    Ok(Json(SessionView {
        navigation: visible_navigation(&role),
        user_id: session.user_id,
        org_id: session.org_id,
        org_slug: session.org_slug,
        role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::rbac::{Membership, MembershipLoad};

    fn state(role: &str) -> RoleState {
        RoleState::resolve(&MembershipLoad::Loaded(Some(Membership { role: role.into() })))
    }

    #[test]
    fn members_do_not_see_admin_links() {
        let hrefs: Vec<_> = visible_navigation(&state("org:member")).iter().map(|e| e.href).collect();
        assert!(hrefs.contains(&"/dashboard/audits"));
        assert!(!hrefs.contains(&"/dashboard/templates"));
        assert!(!hrefs.contains(&"/dashboard/locations"));
    }

    #[test]
    fn admins_see_everything() {
        assert_eq!(visible_navigation(&state("org:admin")).len(), NAVIGATION.len());
    }

    #[test]
    fn unknown_roles_see_nothing() {
        assert!(visible_navigation(&state("org:guest")).is_empty());
    }
}
