//! Error types for `trustlist-core`.
//!
//! Auth errors never carry the submitted password, the token, or the
//! signing secret. Callers facing end users collapse every [`AuthError`]
//! into one generic message.

use trustlist_storage::StorageError;
use uuid::Uuid;

/// Errors from credential checks and token handling.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token could not be parsed as a signed token with the expected claims.
    #[error("malformed token")]
    Malformed,

    /// The token is past its `exp` claim.
    #[error("token expired")]
    Expired,

    /// The token signature does not match the configured secret.
    #[error("token signature mismatch")]
    BadSignature,

    /// Signing or password hashing failed inside the primitive.
    #[error("credential primitive failed: {reason}")]
    Primitive { reason: String },

    /// The user directory could not be read.
    #[error("credential store unavailable: {reason}")]
    Backend { reason: String },
}

/// Why the admin gate refused a mutation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    /// No token, or a token that failed verification.
    #[error("unauthorized")]
    Unauthenticated,

    /// A valid token whose role is not admin.
    #[error("admin role required")]
    NotAdmin,
}

/// Errors from the content document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given id exists.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// The caller edited a stale copy of the service document.
    #[error("service document changed: expected version {expected}, stored version is {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// A stored document could not be encoded or decoded.
    #[error("document serialization failed for '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// The storage backend failed.
    #[error("store backend error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by the tree editor before anything is persisted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No submitted detail had a non-blank heading, body, and link.
    #[error("at least one detail needs a heading, description, and link")]
    NoValidDetail,

    /// A required field was blank after trimming.
    #[error("missing required field '{field}'")]
    MissingRequiredField { field: &'static str },

    /// A positional index does not address an existing card or detail.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}
