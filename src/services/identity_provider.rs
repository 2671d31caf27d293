// src/services/identity_provider.rs

use serde::Deserialize;

use crate::{
    common::error::AppError,
    models::{
        auth::normalize_role,
        identity::{MembershipData, UserData, UserRecord},
    },
    services::identity_sync::IdentitySync,
};

pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct MembershipPage {
    data: Vec<MembershipData>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub users: usize,
    pub skipped: usize,
    pub memberships: usize,
}

/// Backend API client of the identity provider, used to backfill the mirror
/// when webhooks were missed.
#[derive(Clone)]
pub struct IdentityProvider {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl IdentityProvider {
    pub fn new(client: reqwest::Client, api_url: &str, secret_key: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    async fn get_page<T: serde::de::DeserializeOwned>(&self, path: &str, offset: usize) -> Result<T, AppError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("limit", PAGE_SIZE), ("offset", offset)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProviderError(format!("GET {} returned {}: {}", path, status, body)));
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn list_users(&self, offset: usize) -> Result<Vec<UserData>, AppError> {
        self.get_page("/users", offset).await
    }

    pub async fn list_memberships(&self, external_org_id: &str, offset: usize) -> Result<Vec<MembershipData>, AppError> {
        let path = format!("/organizations/{}/memberships", external_org_id);
        let page: MembershipPage = self.get_page(&path, offset).await?;
        Ok(page.data)
    }

    /// Upserts every user with an email and, given an organization, its memberships.
    pub async fn sync(&self, sync: &dyn IdentitySync, external_org_id: Option<&str>) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::default();

        let mut offset = 0;
        loop {
            let users = self.list_users(offset).await?;
            report += apply_users(sync, &users).await?;
            if users.len() < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        if let Some(org_id) = external_org_id {
            let mut offset = 0;
            loop {
                let memberships = self.list_memberships(org_id, offset).await?;
                report.memberships += apply_memberships(sync, &memberships).await?;
                if memberships.len() < PAGE_SIZE {
                    break;
                }
                offset += PAGE_SIZE;
            }
        }

        tracing::info!(
            users = report.users,
            skipped = report.skipped,
            memberships = report.memberships,
            "Identity sync finished"
        );
        Ok(report)
    }
}

impl std::ops::AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.users += other.users;
        self.skipped += other.skipped;
        self.memberships += other.memberships;
    }
}

async fn apply_users(sync: &dyn IdentitySync, users: &[UserData]) -> Result<SyncReport, AppError> {
    let mut report = SyncReport::default();
    for user in users {
        match UserRecord::from_user_data(user) {
            Some(record) => {
                sync.upsert_user(&record).await?;
                report.users += 1;
            }
            None => {
                tracing::warn!("User {} has no email address, skipping", user.id);
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

async fn apply_memberships(sync: &dyn IdentitySync, memberships: &[MembershipData]) -> Result<usize, AppError> {
    for membership in memberships {
        sync.upsert_membership(
            &membership.organization.id,
            &membership.public_user_data.user_id,
            &normalize_role(&membership.role),
        )
        .await?;
    }
    Ok(memberships.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity_sync::tests::RecordingSync;
    use serde_json::json;

    #[tokio::test]
    async fn users_without_email_are_counted_as_skipped() {
        let users: Vec<UserData> = serde_json::from_value(json!([
            { "id": "user_1", "email_addresses": [{ "id": "e1", "email_address": "a@example.com" }] },
            { "id": "user_2", "email_addresses": [] }
        ]))
        .unwrap();

        let sync = RecordingSync::default();
        let report = apply_users(&sync, &users).await.unwrap();

        assert_eq!(report, SyncReport { users: 1, skipped: 1, memberships: 0 });
        assert_eq!(sync.calls(), vec!["upsert_user:user_1:a@example.com"]);
    }

    #[tokio::test]
    async fn memberships_are_upserted_with_prefixed_roles() {
        let page: MembershipPage = serde_json::from_value(json!({
            "data": [{
                "organization": { "id": "org_1" },
                "public_user_data": { "user_id": "user_1" },
                "role": "member"
            }],
            "total_count": 1
        }))
        .unwrap();

        let sync = RecordingSync::default();
        assert_eq!(apply_memberships(&sync, &page.data).await.unwrap(), 1);
        assert_eq!(sync.calls(), vec!["upsert_membership:org_1:user_1:org:member"]);
    }

    #[tokio::test]
    async fn a_failing_procedure_stops_the_sync() {
        let users: Vec<UserData> = serde_json::from_value(json!([
            { "id": "user_1", "email_addresses": [{ "id": "e1", "email_address": "a@example.com" }] }
        ]))
        .unwrap();
        assert!(apply_users(&RecordingSync::failing(), &users).await.is_err());
    }

    #[test]
    fn api_url_loses_its_trailing_slash() {
        let provider = IdentityProvider::new(reqwest::Client::new(), "https://api.example.com/v1/", "sk".into());
        assert_eq!(provider.api_url, "https://api.example.com/v1");
    }
}
