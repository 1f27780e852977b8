// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strongbox vault.

use thiserror::Error;
use uuid::Uuid;

/// The primary error type used across collaborator traits and vault operations.
///
/// Callers are expected to match on it exhaustively. `IntegrityViolation` is a
/// security event and is never folded into ordinary authentication failures.
#[derive(Debug, Error)]
pub enum StrongboxError {
    /// No vault has been created on this device yet.
    #[error("vault is not initialized")]
    NotInitialized,

    /// A key hierarchy already exists; initialization would overwrite it.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The hardware key adapter (or the presence sensor) is not usable.
    #[error("secure hardware is unavailable")]
    HardwareUnavailable,

    /// An unwrap was attempted without a valid, fresh presence proof.
    #[error("a valid presence proof is required for this key operation")]
    HardwarePresenceRequired,

    /// The operation needs an unlocked session.
    #[error("vault is locked -- authentication required")]
    AuthenticationRequired,

    /// The user dismissed the presence prompt.
    #[error("authentication canceled by user")]
    UserCanceled,

    /// The presence authenticator refused the request.
    #[error("presence check denied: {0}")]
    PresenceDenied(PresenceFailure),

    /// No key-encryption key is stored for the requested version.
    #[error("no key-encryption key for version {version}")]
    KeyNotFound { version: u32 },

    /// Symmetric key material was not 256 bits.
    #[error("invalid key size: expected 32 bytes, got {len}")]
    KeySizeInvalid { len: usize },

    /// A record failed its digest or AEAD verification.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// A record could not be decoded or had structurally invalid fields.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Rotation aborted; no state was changed.
    #[error("key rotation failed for {failed_count} credential(s); vault left unchanged")]
    KeyRotationFailed { failed_count: usize },

    /// No credential with this id is in the index.
    #[error("credential not found: {0}")]
    CredentialNotFound(Uuid),

    /// PIN unlock was requested but no PIN has been configured.
    #[error("PIN unlock is not enabled")]
    PinNotEnabled,

    /// The PIN was rejected.
    #[error("invalid PIN ({remaining_attempts} attempt(s) remaining)")]
    InvalidPin { remaining_attempts: u32 },

    /// The PIN offered to `enable_pin` is shorter than the configured minimum.
    #[error("PIN must be at least {min_length} characters")]
    WeakPin { min_length: usize },

    /// Too many failed PIN attempts.
    #[error("PIN unlock locked out; retry in {retry_after:?}")]
    PinLockedOut { retry_after: std::time::Duration },

    /// Durable store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors (RNG failure, key construction).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a presence authenticator can refuse to issue a proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceFailure {
    #[error("user canceled")]
    UserCanceled,

    #[error("no biometric or passcode is enrolled")]
    NotEnrolled,

    #[error("too many failed attempts; locked out for {retry_after_secs}s")]
    LockedOut { retry_after_secs: u64 },

    #[error("presence hardware unavailable")]
    HardwareUnavailable,

    #[error("{0}")]
    Failed(String),
}

impl From<PresenceFailure> for StrongboxError {
    fn from(failure: PresenceFailure) -> Self {
        match failure {
            PresenceFailure::UserCanceled => StrongboxError::UserCanceled,
            PresenceFailure::HardwareUnavailable => StrongboxError::HardwareUnavailable,
            other => StrongboxError::PresenceDenied(other),
        }
    }
}

impl StrongboxError {
    /// Wrap any error as a storage error.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StrongboxError::Storage {
            source: source.into(),
        }
    }

    /// True for failures that must be surfaced as security events.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            StrongboxError::IntegrityViolation(_) | StrongboxError::PinLockedOut { .. }
        )
    }
}
