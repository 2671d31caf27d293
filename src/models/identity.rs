// src/models/identity.rs

//! Identity provider payloads and the mirrored rows they produce.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub id: Option<String>,
    pub email_address: String,
}

/// `user.*` event data and the provider's user list entries share this shape.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UserData {
    /// The primary address when flagged, otherwise the first one.
    pub fn primary_email(&self) -> Option<&str> {
        self.primary_email_address_id
            .as_deref()
            .and_then(|primary| {
                self.email_addresses
                    .iter()
                    .find(|e| e.id.as_deref() == Some(primary))
            })
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedObject {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipOrganization {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicUserData {
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipData {
    pub organization: MembershipOrganization,
    pub public_user_data: PublicUserData,
    // absent on some delete payloads
    #[serde(default)]
    pub role: String,
}

/// Parameters of the user upsert procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserRecord {
    /// `None` when the user has no email address to mirror.
    pub fn from_user_data(data: &UserData) -> Option<Self> {
        let email = data.primary_email()?;
        Some(UserRecord {
            external_id: data.id.clone(),
            email: email.to_string(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            avatar_url: data.image_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_email_prefers_the_flagged_address() {
        let data: UserData = serde_json::from_value(serde_json::json!({
            "id": "user_1",
            "primary_email_address_id": "idn_2",
            "email_addresses": [
                { "id": "idn_1", "email_address": "old@example.com" },
                { "id": "idn_2", "email_address": "new@example.com" }
            ]
        }))
        .unwrap();
        assert_eq!(data.primary_email(), Some("new@example.com"));
    }

    #[test]
    fn users_without_email_produce_no_record() {
        let data: UserData = serde_json::from_value(serde_json::json!({ "id": "user_1" })).unwrap();
        assert_eq!(UserRecord::from_user_data(&data), None);
    }
}
