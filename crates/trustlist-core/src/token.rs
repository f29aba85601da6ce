//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying the subject id, email, and role of the
//! user that logged in. The signing secret is held only by the server and is
//! never serialized, logged, or exposed through `Debug`.
//!
//! # Security model
//!
//! - `verify` checks the signature before anything else, then `exp` with
//!   zero leeway.
//! - `decode_unverified` exists only for the compatibility mode of the
//!   admin gate and must not be used to authorize anything on its own.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default token lifetime in seconds: seven days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// The role claim value that grants admin rights.
pub const ADMIN_ROLE: &str = "admin";

/// Role derived from a token's claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Admin,
}

impl Role {
    /// Map a raw `role` claim to a [`Role`]. Anything but `"admin"` is a guest.
    #[must_use]
    pub fn from_claim(claim: &str) -> Self {
        if claim == ADMIN_ROLE {
            Self::Admin
        } else {
            Self::Guest
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

/// Identity fields embedded in a token at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id. Tokens from the previous deployment used `id`.
    #[serde(alias = "id")]
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_claim(&self.role)
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject {
            id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// Issues and verifies signed tokens with a server-held secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl TokenService {
    /// Build a token service for `secret`, issuing tokens valid for `default_ttl`.
    #[must_use]
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            default_ttl,
        }
    }

    /// Lifetime used by [`issue_default`](Self::issue_default).
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if signing fails.
    pub fn issue(&self, subject: &Subject, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token with the configured default lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if signing fails.
    pub fn issue_default(&self, subject: &Subject) -> Result<String, AuthError> {
        self.issue(subject, self.default_ttl)
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if signing fails or `now + ttl` is
    /// outside the representable date range.
    pub fn issue_at(
        &self,
        subject: &Subject,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Primitive {
                reason: format!("token lifetime {ttl} overflows the expiry time"),
            })?;

        let claims = Claims {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |e| AuthError::Primitive {
                reason: format!("token signing failed: {e}"),
            },
        )
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// The subject may arrive as `sub` or as the legacy `id` claim; a token
    /// carrying neither fails to decode.
    ///
    /// # Errors
    ///
    /// - [`AuthError::BadSignature`] if the token was signed with another secret.
    /// - [`AuthError::Expired`] if `exp` is in the past.
    /// - [`AuthError::Malformed`] for anything that does not parse.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            })
    }
}

/// Read the claims of a token without checking signature or expiry.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] if the token does not parse.
pub fn decode_unverified(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::Malformed)
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn admin() -> Subject {
        Subject {
            id: "64f0c0ffee".to_owned(),
            email: "ops@example.com".to_owned(),
            role: ADMIN_ROLE.to_owned(),
        }
    }

    #[test]
    fn verify_returns_issued_claims() {
        let service = TokenService::new(b"test-secret", Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
        let token = service.issue(&admin(), Duration::hours(1)).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.subject(), admin());
        assert_eq!(claims.role(), Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let service = TokenService::new(b"test-secret", Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
        let issued = Utc::now() - Duration::hours(2);
        let token = service
            .issue_at(&admin(), Duration::hours(1), issued)
            .unwrap();

        assert_eq!(service.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let issuer = TokenService::new(b"secret-a", Duration::days(7));
        let verifier = TokenService::new(b"secret-b", Duration::days(7));
        let token = issuer.issue(&admin(), Duration::hours(1)).unwrap();

        assert_eq!(verifier.verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn verify_rejects_garbage() {
        let service = TokenService::new(b"test-secret", Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
        assert_eq!(service.verify("not-a-token"), Err(AuthError::Malformed));
        assert_eq!(service.verify("a.b.c"), Err(AuthError::Malformed));
    }

    #[test]
    fn unverified_decode_ignores_signature_and_expiry() {
        let forger = TokenService::new(b"attacker", Duration::days(7));
        let stale = Utc::now() - Duration::days(30);
        let token = forger.issue_at(&admin(), Duration::hours(1), stale).unwrap();

        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.role(), Role::Admin);
    }

    #[test]
    fn legacy_id_claim_is_accepted() {
        let claims: Claims =
            serde_json::from_str(r#"{"id":"abc","email":"a@b.c","role":"admin","exp":1}"#).unwrap();
        assert_eq!(claims.sub, "abc");
    }

    #[test]
    fn verify_accepts_signed_token_with_legacy_id_claim() {
        let service = TokenService::new(b"test-secret", Duration::days(7));
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let legacy = serde_json::json!({"id": "abc", "email": "a@b.c", "role": "admin", "exp": exp});
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &legacy,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "abc");
        assert_eq!(claims.role(), Role::Admin);
    }

    #[test]
    fn verify_rejects_token_without_subject() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let anonymous = serde_json::json!({"role": "admin", "exp": exp});
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &anonymous,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let service = TokenService::new(b"test-secret", Duration::days(7));
        assert_eq!(service.verify(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn issue_rejects_lifetime_past_the_calendar() {
        let service = TokenService::new(b"test-secret", Duration::seconds(10_000_000_000_000));
        let err = service.issue_default(&admin()).unwrap_err();
        assert!(matches!(err, AuthError::Primitive { .. }));
    }

    #[test]
    fn debug_redacts_secret() {
        let service = TokenService::new(b"super-secret-value", Duration::days(7));
        let rendered = format!("{service:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn only_admin_claim_is_admin() {
        assert_eq!(Role::from_claim("admin"), Role::Admin);
        assert_eq!(Role::from_claim("Admin"), Role::Guest);
        assert_eq!(Role::from_claim("user"), Role::Guest);
    }
}
