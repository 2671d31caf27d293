// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ADMIN_ROLE: &str = "org:admin";
pub const MEMBER_ROLE: &str = "org:member";

/// Claims of the identity provider's session token. Two layouts exist in the
/// wild: flat `org_*` claims and the compact `o` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub org_role: Option<String>,
    #[serde(default)]
    pub org_slug: Option<String>,
    #[serde(default)]
    pub o: Option<OrgClaim>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgClaim {
    pub id: String,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub slg: Option<String>,
}

/// The request-scoped identity: who is calling and in which organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// External user id
    #[schema(example = "user_2abc")]
    pub user_id: String,
    pub session_id: Option<String>,
    /// External organization id of the active organization
    #[schema(example = "org_2xyz")]
    pub org_id: Option<String>,
    #[schema(example = "org:admin")]
    pub org_role: Option<String>,
    pub org_slug: Option<String>,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        let (org_id, org_role, org_slug) = match claims.o {
            Some(o) => (Some(o.id), o.rol, o.slg),
            None => (claims.org_id, claims.org_role, claims.org_slug),
        };

        Session {
            user_id: claims.sub,
            session_id: claims.sid,
            org_id: org_id.filter(|id| !id.is_empty()),
            org_role: org_role.map(|r| normalize_role(&r)),
            org_slug,
        }
    }
}

/// The compact claim layout drops the `org:` prefix from role keys.
pub fn normalize_role(role: &str) -> String {
    if role.starts_with("org:") {
        role.to_string()
    } else {
        format!("org:{}", role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_claims_map_directly() {
        let claims: SessionClaims = serde_json::from_value(serde_json::json!({
            "sub": "user_1", "exp": 1, "sid": "sess_1",
            "org_id": "org_1", "org_role": "org:admin", "org_slug": "acme"
        }))
        .unwrap();
        let session = Session::from(claims);
        assert_eq!(session.user_id, "user_1");
        assert_eq!(session.org_id.as_deref(), Some("org_1"));
        assert_eq!(session.org_role.as_deref(), Some(ADMIN_ROLE));
    }

    #[test]
    fn compact_org_claim_is_normalized() {
        let claims: SessionClaims = serde_json::from_value(serde_json::json!({
            "sub": "user_1", "exp": 1,
            "o": { "id": "org_9", "rol": "member", "slg": "acme" }
        }))
        .unwrap();
        let session = Session::from(claims);
        assert_eq!(session.org_id.as_deref(), Some("org_9"));
        assert_eq!(session.org_role.as_deref(), Some(MEMBER_ROLE));
        assert_eq!(session.org_slug.as_deref(), Some("acme"));
    }

    #[test]
    fn no_org_means_personal_session() {
        let claims: SessionClaims =
            serde_json::from_value(serde_json::json!({ "sub": "user_1", "exp": 1, "org_id": "" })).unwrap();
        let session = Session::from(claims);
        assert_eq!(session.org_id, None);
        assert_eq!(session.org_role, None);
    }
}
