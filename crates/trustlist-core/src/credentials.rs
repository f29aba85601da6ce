//! Credential verification and the user directory.
//!
//! Users are stored one per key under `users/<email>`; lookups are exact and
//! case-sensitive. Password hashes are produced and checked through the
//! [`PasswordHasher`] trait so the primitive stays swappable; [`BcryptHasher`]
//! reads the `$2a$`/`$2b$` hashes already present in existing user records.
//!
//! # Security model
//!
//! - Unknown email and wrong password both yield
//!   [`AuthError::InvalidCredentials`].
//! - An unknown email still pays for one hash verification against a dummy
//!   hash, so response timing does not reveal which emails exist.
//! - Hash checks run on the blocking pool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trustlist_storage::StorageBackend;
use uuid::Uuid;

use crate::error::{AuthError, StoreError};
use crate::token::Subject;

/// Storage prefix for user records.
const USER_PREFIX: &str = "users/";

/// Hashes and checks passwords.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Produce a salted hash of `password`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Whether `password` matches `hash`. Unparsable hashes never match.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::Primitive {
            reason: format!("password hashing failed: {e}"),
        })
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

/// A stored user credential record.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: String,
}

impl UserRecord {
    /// The identity embedded in tokens issued for this user.
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject {
            id: self.id.to_string(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Persists user records keyed by exact email.
pub struct UserDirectory {
    storage: Arc<dyn StorageBackend>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    fn key(email: &str) -> String {
        format!("{USER_PREFIX}{email}")
    }

    /// Look up a user by exact email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails or the record is corrupt.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let key = Self::key(email);
        let Some(raw) = self.storage.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                key,
                reason: e.to_string(),
            })
    }

    /// Create or replace the record for `record.email`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if encoding or storage fails.
    pub async fn upsert(&self, record: &UserRecord) -> Result<(), StoreError> {
        let key = Self::key(&record.email);
        let raw = serde_json::to_vec(record).map_err(|e| StoreError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &raw).await?;
        info!(email = %record.email, role = %record.role, "user record stored");
        Ok(())
    }

    /// Emails of all stored users, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] if listing fails.
    pub async fn emails(&self) -> Result<Vec<String>, StoreError> {
        let keys = self.storage.list(USER_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(USER_PREFIX).map(str::to_owned))
            .collect())
    }
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory").finish_non_exhaustive()
    }
}

/// Checks submitted email/password pairs against the user directory.
pub struct CredentialVerifier {
    users: Arc<UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Build a verifier. Hashes a throwaway password once for the
    /// unknown-email path.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if the hasher fails.
    pub fn new(users: Arc<UserDirectory>, hasher: Arc<dyn PasswordHasher>) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            users,
            hasher,
            dummy_hash,
        })
    }

    /// Authenticate `email` / `password`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for an unknown email or a wrong password.
    /// - [`AuthError::Backend`] if the user directory cannot be read.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(|e| AuthError::Backend {
                reason: e.to_string(),
            })?;

        let hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Primitive {
                reason: format!("password check task failed: {e}"),
            })?;

        match user {
            Some(user) if matches => {
                debug!(email = %user.email, "credentials accepted");
                Ok(user)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use trustlist_storage::MemoryBackend;

    const FAST_COST: u32 = 4;

    async fn verifier_with(email: &str, password: &str, role: &str) -> CredentialVerifier {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let users = Arc::new(UserDirectory::new(storage));
        let hasher = Arc::new(BcryptHasher::new(FAST_COST));
        users
            .upsert(&UserRecord {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                password_hash: hasher.hash(password).unwrap(),
                role: role.to_owned(),
            })
            .await
            .unwrap();
        CredentialVerifier::new(users, hasher).unwrap()
    }

    #[tokio::test]
    async fn accepts_correct_password() {
        let verifier = verifier_with("ops@example.com", "hunter2", "admin").await;
        let user = verifier
            .authenticate("ops@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(user.role, "admin");
        assert_eq!(user.subject().email, "ops@example.com");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let verifier = verifier_with("ops@example.com", "hunter2", "admin").await;

        let unknown = verifier.authenticate("nobody@example.com", "hunter2").await;
        let wrong = verifier.authenticate("ops@example.com", "hunter3").await;

        assert_eq!(unknown.unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let verifier = verifier_with("ops@example.com", "hunter2", "admin").await;
        let result = verifier.authenticate("Ops@example.com", "hunter2").await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!BcryptHasher::new(FAST_COST).verify("x", "not-a-bcrypt-hash"));
    }

    #[test]
    fn record_debug_hides_hash() {
        let record = UserRecord {
            id: Uuid::nil(),
            email: "a@example.com".to_owned(),
            password_hash: "$2b$04$secretsecretsecret".to_owned(),
            role: "admin".to_owned(),
        };
        assert!(!format!("{record:?}").contains("secretsecret"));
    }

    #[tokio::test]
    async fn directory_lists_emails() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let users = UserDirectory::new(storage);
        for email in ["b@example.com", "a@example.com"] {
            users
                .upsert(&UserRecord {
                    id: Uuid::new_v4(),
                    email: email.to_owned(),
                    password_hash: String::new(),
                    role: "user".to_owned(),
                })
                .await
                .unwrap();
        }
        assert_eq!(
            users.emails().await.unwrap(),
            vec!["a@example.com", "b@example.com"]
        );
    }
}
