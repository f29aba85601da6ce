//! Admin gate: derives a role from a bearer token and guards mutations.
//!
//! Two modes exist. [`GateMode::Verified`] runs the full token verification
//! before trusting the `role` claim. [`GateMode::DecodeOnly`] keeps the
//! legacy behaviour of decoding claims without checking signature or expiry.
//! Anyone can mint a token-shaped string with `role: admin` under that mode,
//! so it is only reachable through an explicitly named configuration flag.
//!
//! A missing, malformed, expired, or forged token always degrades to
//! [`Role::Guest`]; the reason is logged at debug level and never returned to
//! the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AccessError, AuthError};
use crate::token::{self, Claims, Role, TokenService};

/// How the gate reads tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Signature and expiry are verified before the role claim is trusted.
    Verified,
    /// Claims are decoded without verification. Compatibility only.
    DecodeOnly,
}

/// Derives roles from tokens and enforces the admin-only policy.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
    mode: GateMode,
}

impl AuthGate {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, mode: GateMode) -> Self {
        if mode == GateMode::DecodeOnly {
            warn!("admin gate trusts unverified role claims; any client can claim admin");
        }
        Self { tokens, mode }
    }

    #[must_use]
    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Read the claims of `token` according to the gate mode.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] from verification or decoding.
    pub fn claims(&self, token: &str) -> Result<Claims, AuthError> {
        match self.mode {
            GateMode::Verified => self.tokens.verify(token),
            GateMode::DecodeOnly => token::decode_unverified(token),
        }
    }

    /// The caller's role. Absent or unusable tokens yield [`Role::Guest`].
    #[must_use]
    pub fn derive_role(&self, token: Option<&str>) -> Role {
        let Some(token) = token else {
            return Role::Guest;
        };
        match self.claims(token) {
            Ok(claims) => claims.role(),
            Err(e) => {
                debug!(reason = %e, "token rejected, treating caller as guest");
                Role::Guest
            }
        }
    }

    /// Allow the call only for admins, returning their claims.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unauthenticated`] if the token is absent or unusable.
    /// - [`AccessError::NotAdmin`] if the token is valid but the role is not admin.
    pub fn require_admin(&self, token: Option<&str>) -> Result<Claims, AccessError> {
        let token = token.ok_or(AccessError::Unauthenticated)?;
        let claims = self.claims(token).map_err(|e| {
            debug!(reason = %e, "admin gate rejected token");
            AccessError::Unauthenticated
        })?;

        if claims.role().is_admin() {
            Ok(claims)
        } else {
            debug!(sub = %claims.sub, "admin gate denied non-admin caller");
            Err(AccessError::NotAdmin)
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
