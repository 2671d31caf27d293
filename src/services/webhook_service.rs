// src/services/webhook_service.rs

//! Webhooks do provedor de identidade: verificação de assinatura no formato svix
//! e um registro por tipo de evento que repassa cada evento às procedures do espelho.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use sha2::Sha256;

use crate::{
    common::error::AppError,
    models::{
        auth::normalize_role,
        identity::{DeletedObject, MembershipData, OrganizationData, UserData, UserRecord},
    },
    services::identity_sync::IdentitySync,
};

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

/// Diferença de relógio aceita entre o provedor e nós, em segundos.
pub const TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl WebhookVerifier {
    /// `secret` é o valor `whsec_<base64>` do painel do provedor.
    pub fn new(secret: &str) -> Result<Self, AppError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD.decode(encoded.trim()).map_err(|e| {
            tracing::error!("CLERK_WEBHOOK_SECRET is not valid base64: {}", e);
            AppError::WebhookNotConfigured
        })?;
        let mac = HmacSha256::new_from_slice(&key).map_err(|_| AppError::WebhookNotConfigured)?;
        Ok(Self { mac })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    /// Assinatura `v1,<base64>` sobre `{id}.{timestamp}.{body}`.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> String {
        let digest = self.mac(id, timestamp, body).finalize().into_bytes();
        format!("v1,{}", STANDARD.encode(digest))
    }

    /// O cabeçalho pode trazer várias assinaturas separadas por espaço; basta uma bater.
    pub fn verify(&self, id: &str, timestamp: &str, signatures: &str, body: &[u8], now: i64) -> Result<(), AppError> {
        // 1. Timestamp numérico
        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidWebhook("errors.webhook.invalid_signature"))?;
        // 2. Janela de tempo. O cabeçalho ainda não foi autenticado: valores extremos não podem estourar
        let skew = now.checked_sub(sent_at).map(i64::unsigned_abs);
        if !matches!(skew, Some(secs) if secs <= TOLERANCE_SECS as u64) {
            tracing::warn!("Webhook {} timestamp {} outside tolerance", id, sent_at);
            return Err(AppError::InvalidWebhook("errors.webhook.invalid_signature"));
        }

        // 3. Alguma das assinaturas precisa bater
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|encoded| STANDARD.decode(encoded).ok())
            .any(|candidate| self.mac(id, timestamp, body).verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(AppError::InvalidWebhook("errors.webhook.invalid_signature"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Applied,
    Skipped(&'static str),
    Ignored,
}

type Handler = for<'a> fn(&'a dyn IdentitySync, Value) -> BoxFuture<'a, Result<Handled, AppError>>;

/// Tipo do evento -> handler.
pub static HANDLERS: [(&str, Handler); 9] = [
    ("user.created", on_user_upsert),
    ("user.updated", on_user_upsert),
    ("user.deleted", on_user_deleted),
    ("organization.created", on_organization_upsert),
    ("organization.updated", on_organization_upsert),
    ("organization.deleted", on_organization_deleted),
    ("organizationMembership.created", on_membership_upsert),
    ("organizationMembership.updated", on_membership_upsert),
    ("organizationMembership.deleted", on_membership_deleted),
];

pub async fn dispatch(sync: &dyn IdentitySync, event: WebhookEvent) -> Result<Handled, AppError> {
    match HANDLERS.iter().find(|(tag, _)| *tag == event.event_type) {
        Some((tag, handler)) => {
            let handled = handler(sync, event.data).await?;
            tracing::info!(event = %tag, outcome = ?handled, "Webhook processed");
            Ok(handled)
        }
        None => {
            tracing::info!("Unhandled webhook event type: {}", event.event_type);
            Ok(Handled::Ignored)
        }
    }
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|e| {
        tracing::warn!("Malformed webhook data: {}", e);
        AppError::InvalidWebhook("errors.webhook.invalid_payload")
    })
}

fn on_user_upsert(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let user: UserData = parse(data)?;
        match UserRecord::from_user_data(&user) {
            Some(record) => {
                sync.upsert_user(&record).await?;
                Ok(Handled::Applied)
            }
            None => {
                tracing::warn!("User {} has no email address, skipping", user.id);
                Ok(Handled::Skipped("no email address"))
            }
        }
    })
}

fn on_user_deleted(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let deleted: DeletedObject = parse(data)?;
        let Some(id) = deleted.id else {
            return Ok(Handled::Skipped("missing id"));
        };
        sync.delete_user(&id).await?;
        Ok(Handled::Applied)
    })
}

fn on_organization_upsert(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let org: OrganizationData = parse(data)?;
        sync.upsert_organization(&org.id, &org.name, org.slug.as_deref(), org.image_url.as_deref())
            .await?;
        Ok(Handled::Applied)
    })
}

fn on_organization_deleted(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let deleted: DeletedObject = parse(data)?;
        let Some(id) = deleted.id else {
            return Ok(Handled::Skipped("missing id"));
        };
        sync.delete_organization(&id).await?;
        Ok(Handled::Applied)
    })
}

fn on_membership_upsert(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let membership: MembershipData = parse(data)?;
        let role = normalize_role(&membership.role);
        sync.upsert_membership(&membership.organization.id, &membership.public_user_data.user_id, &role)
            .await?;
        Ok(Handled::Applied)
    })
}

fn on_membership_deleted(sync: &dyn IdentitySync, data: Value) -> BoxFuture<'_, Result<Handled, AppError>> {
    Box::pin(async move {
        let membership: MembershipData = parse(data)?;
        sync.delete_membership(&membership.organization.id, &membership.public_user_data.user_id)
            .await?;
        Ok(Handled::Applied)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::identity_sync::tests::RecordingSync;
    use serde_json::json;

    // base64("test-webhook-key")
    pub(crate) const SECRET: &str = "whsec_dGVzdC13ZWJob29rLWtleQ==";

    fn event(event_type: &str, data: Value) -> WebhookEvent {
        WebhookEvent { event_type: event_type.into(), data }
    }

    #[test]
    fn accepts_its_own_signature() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = br#"{"type":"user.created"}"#;
        let signature = verifier.sign("msg_1", "1700000000", body);
        assert!(verifier.verify("msg_1", "1700000000", &signature, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn any_listed_signature_may_match() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = b"{}";
        let header = format!("v1,bm9wZQ== {}", verifier.sign("msg_1", "1700000000", body));
        assert!(verifier.verify("msg_1", "1700000000", &header, body, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_tampered_bodies_and_stale_timestamps() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let signature = verifier.sign("msg_1", "1700000000", b"{}");

        assert!(verifier.verify("msg_1", "1700000000", &signature, b"{ }", 1_700_000_000).is_err());
        assert!(verifier.verify("msg_1", "1700000000", &signature, b"{}", 1_700_000_000 + 301).is_err());
        assert!(verifier.verify("msg_1", "not-a-number", &signature, b"{}", 1_700_000_000).is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        for timestamp in ["-9223372036854775808", "9223372036854775807"] {
            let signature = verifier.sign("msg_1", timestamp, b"{}");
            let err = verifier
                .verify("msg_1", timestamp, &signature, b"{}", 1_700_000_000)
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidWebhook("errors.webhook.invalid_signature")));
        }
    }

    #[test]
    fn rejects_a_secret_that_is_not_base64() {
        assert!(matches!(WebhookVerifier::new("whsec_%%%"), Err(AppError::WebhookNotConfigured)));
    }

    #[test]
    fn every_tag_is_registered_once() {
        let mut tags: Vec<&str> = HANDLERS.iter().map(|(tag, _)| *tag).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), HANDLERS.len());
    }

    #[tokio::test]
    async fn user_created_upserts_with_primary_email() {
        let sync = RecordingSync::default();
        let data = json!({
            "id": "user_1",
            "email_addresses": [{ "id": "idn_1", "email_address": "ana@example.com" }],
            "first_name": "Ana"
        });
        let handled = dispatch(&sync, event("user.created", data)).await.unwrap();
        assert_eq!(handled, Handled::Applied);
        assert_eq!(sync.calls(), vec!["upsert_user:user_1:ana@example.com"]);
    }

    #[tokio::test]
    async fn user_without_email_is_skipped() {
        let sync = RecordingSync::default();
        let data = json!({ "id": "user_1", "email_addresses": [] });
        let handled = dispatch(&sync, event("user.created", data)).await.unwrap();
        assert!(matches!(handled, Handled::Skipped(_)));
        assert!(sync.calls().is_empty());
    }

    #[tokio::test]
    async fn membership_roles_are_normalized() {
        let sync = RecordingSync::default();
        let data = json!({
            "organization": { "id": "org_1" },
            "public_user_data": { "user_id": "user_1" },
            "role": "admin"
        });
        dispatch(&sync, event("organizationMembership.created", data)).await.unwrap();
        assert_eq!(sync.calls(), vec!["upsert_membership:org_1:user_1:org:admin"]);
    }

    #[tokio::test]
    async fn unknown_types_are_ignored() {
        let sync = RecordingSync::default();
        let handled = dispatch(&sync, event("session.created", json!({}))).await.unwrap();
        assert_eq!(handled, Handled::Ignored);
        assert!(sync.calls().is_empty());
    }

    #[tokio::test]
    async fn procedure_failures_propagate() {
        let sync = RecordingSync::failing();
        let result = dispatch(&sync, event("organization.deleted", json!({ "id": "org_1" }))).await;
        assert!(result.is_err());
        assert_eq!(sync.calls(), vec!["delete_organization:org_1"]);
    }
}
