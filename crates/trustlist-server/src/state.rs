//! Shared application state for the Trust-List server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use trustlist_core::credentials::{CredentialVerifier, PasswordHasher, UserDirectory, UserRecord};
use trustlist_core::error::{AuthError, StoreError};
use trustlist_core::gate::{AuthGate, GateMode};
use trustlist_core::store::ContentStore;
use trustlist_core::token::{ADMIN_ROLE, TokenService};
use trustlist_storage::StorageBackend;

use crate::config::AdminBootstrap;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Navbar and service documents.
    pub store: Arc<ContentStore>,
    /// User records, for admin bootstrap.
    pub users: Arc<UserDirectory>,
    /// Email/password checks for login.
    pub credentials: Arc<CredentialVerifier>,
    /// Token issuing.
    pub tokens: Arc<TokenService>,
    /// Role derivation and the admin-only policy.
    pub gate: AuthGate,
}

impl AppState {
    /// Wire every subsystem onto one storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Primitive`] if the hasher cannot produce the
    /// verifier's dummy hash.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        tokens: TokenService,
        mode: GateMode,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, AuthError> {
        let users = Arc::new(UserDirectory::new(Arc::clone(&storage)));
        let credentials = Arc::new(CredentialVerifier::new(Arc::clone(&users), hasher)?);
        let tokens = Arc::new(tokens);
        let gate = AuthGate::new(Arc::clone(&tokens), mode);

        Ok(Self {
            store: Arc::new(ContentStore::new(storage)),
            users,
            credentials,
            tokens,
            gate,
        })
    }

    /// Create the configured admin account, or refresh its hash and role.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the user directory cannot be read or written.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<(), StoreError> {
        let id = self
            .users
            .find_by_email(&admin.email)
            .await?
            .map_or_else(Uuid::new_v4, |existing| existing.id);

        self.users
            .upsert(&UserRecord {
                id,
                email: admin.email.clone(),
                password_hash: admin.password_hash.clone(),
                role: ADMIN_ROLE.to_owned(),
            })
            .await?;
        info!(email = %admin.email, "admin account bootstrapped");
        Ok(())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate_mode", &self.gate.mode())
            .finish_non_exhaustive()
    }
}
