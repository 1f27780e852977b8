// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across collaborator traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Maximum age, in seconds, at which a presence proof is still accepted.
pub const PRESENCE_PROOF_MAX_AGE: i64 = 30;

/// Logical partitions of the durable key-value store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Wrapped key-encryption keys, keyed by version.
    Kek,
    /// Per-version CDK derivation salts, keyed by version.
    Salt,
    /// Encrypted credential records, keyed by `<version>/<id>`.
    Credentials,
    /// The single vault metadata document.
    Metadata,
    /// PIN-wrapped KEK copies, keyed by version.
    Pin,
    /// Software device key (hosts without a secure element).
    Device,
    /// Presence authenticator enrollment and lockout state.
    Auth,
}

impl Namespace {
    pub const ALL: [Namespace; 7] = [
        Namespace::Kek,
        Namespace::Salt,
        Namespace::Credentials,
        Namespace::Metadata,
        Namespace::Pin,
        Namespace::Device,
        Namespace::Auth,
    ];
}

/// Token certifying a successful presence check, scoped to one operation.
///
/// Proofs are only honored by key adapters while fresh (see
/// [`PRESENCE_PROOF_MAX_AGE`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceProof {
    id: Uuid,
    reason: String,
    issued_at: DateTime<Utc>,
}

impl PresenceProof {
    /// Issue a proof for `reason` at `issued_at`. Called by authenticators only
    /// after the user has actually been verified.
    pub fn issue(reason: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reason: reason.into(),
            issued_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Whether the proof was issued no earlier than the freshness window and
    /// not in the future relative to `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.issued_at).num_seconds();
        (0..=PRESENCE_PROOF_MAX_AGE).contains(&age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_is_fresh_within_window() {
        let now = Utc::now();
        let proof = PresenceProof::issue("unlock", now);
        assert!(proof.is_fresh_at(now));
        assert!(proof.is_fresh_at(now + chrono::Duration::seconds(PRESENCE_PROOF_MAX_AGE)));
    }

    #[test]
    fn proof_expires_after_window() {
        let now = Utc::now();
        let proof = PresenceProof::issue("unlock", now);
        assert!(!proof.is_fresh_at(now + chrono::Duration::seconds(PRESENCE_PROOF_MAX_AGE + 1)));
    }

    #[test]
    fn proof_from_the_future_is_rejected() {
        let now = Utc::now();
        let proof = PresenceProof::issue("unlock", now + chrono::Duration::seconds(10));
        assert!(!proof.is_fresh_at(now));
    }

    #[test]
    fn proofs_have_distinct_ids() {
        let now = Utc::now();
        let a = PresenceProof::issue("x", now);
        let b = PresenceProof::issue("x", now);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.reason(), "x");
    }

    #[test]
    fn namespace_serializes_snake_case() {
        let json = serde_json::to_string(&Namespace::Kek).unwrap();
        assert_eq!(json, "\"kek\"");
    }
}
