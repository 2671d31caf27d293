// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Session, SessionClaims},
};

/// Verifies session tokens issued by the identity provider. Sign-in itself
/// happens at the provider; this service only checks what it hands us.
#[derive(Clone)]
pub struct AuthService {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl AuthService {
    /// RS256 verification with the provider's PEM public key. `None` leaves
    /// every request anonymous.
    pub fn from_pem(pem: Option<&str>) -> anyhow::Result<Self> {
        let key = match pem {
            Some(pem) => Some(DecodingKey::from_rsa_pem(pem.as_bytes())?),
            None => {
                tracing::warn!("CLERK_JWT_KEY not set: all requests will be anonymous");
                None
            }
        };
        Ok(Self { key, validation: Self::validation(Algorithm::RS256) })
    }

    /// Shared-secret verification (HS256).
    #[cfg(test)]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: Some(DecodingKey::from_secret(secret)),
            validation: Self::validation(Algorithm::HS256),
        }
    }

    fn validation(alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        // session tokens carry `azp`, not `aud`
        validation.validate_aud = false;
        validation
    }

    pub fn validate_token(&self, token: &str) -> Result<Session, AppError> {
        let key = self.key.as_ref().ok_or(AppError::InvalidToken)?;

        let token_data = decode::<SessionClaims>(token, key, &self.validation)
            .map_err(|_| AppError::InvalidToken)?;

        Ok(Session::from(token_data.claims))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub(crate) const TEST_SECRET: &[u8] = b"test-secret";

    pub(crate) fn token_for(org_id: Option<&str>, role: Option<&str>) -> String {
        let claims = SessionClaims {
            sub: "user_test".into(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
            sid: Some("sess_test".into()),
            org_id: org_id.map(str::to_string),
            org_role: role.map(str::to_string),
            org_slug: None,
            o: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
    }

    #[test]
    fn accepts_a_valid_token() {
        let service = AuthService::from_secret(TEST_SECRET);
        let session = service.validate_token(&token_for(Some("org_1"), Some("org:admin"))).unwrap();
        assert_eq!(session.user_id, "user_test");
        assert_eq!(session.org_id.as_deref(), Some("org_1"));
    }

    #[test]
    fn rejects_a_token_signed_with_another_key() {
        let service = AuthService::from_secret(b"other-secret");
        let result = service.validate_token(&token_for(None, None));
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_expired_tokens() {
        let claims = SessionClaims {
            sub: "user_test".into(),
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
            sid: None,
            org_id: None,
            org_role: None,
            org_slug: None,
            o: None,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap();
        let service = AuthService::from_secret(TEST_SECRET);
        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn without_a_key_everything_is_rejected() {
        let service = AuthService::from_pem(None).unwrap();
        assert!(service.validate_token(&token_for(None, None)).is_err());
    }
}
