// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential model and its encrypted at-rest envelope.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strongbox_core::StrongboxError;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{self, EncryptedRecord};
use crate::kdf::ContentKey;

const AAD_TAG: &[u8] = b"strongbox-aad-v1";

/// A stored secret and its identity metadata.
///
/// `password` and `notes` are the only encrypted fields. `domain` and
/// `username` are bound into the record's associated data.
#[derive(Debug)]
pub struct Credential {
    pub id: Uuid,
    pub domain: String,
    pub username: String,
    pub password: SecretString,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            username: username.into(),
            password,
            notes: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Fields an update may change. `None` leaves the field as it is.
///
/// The domain is part of the credential's identity and cannot change.
#[derive(Debug, Default)]
pub struct CredentialUpdate {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.notes.is_none()
    }
}

/// Identity metadata without the secret, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub domain: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<&Credential> for CredentialSummary {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id,
            domain: c.domain.clone(),
            username: c.username.clone(),
            created_at: c.created_at,
            modified_at: c.modified_at,
        }
    }
}

/// Persisted form of a credential: plaintext identity plus the sealed secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub id: Uuid,
    pub domain: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub record: EncryptedRecord,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct SecretPayload {
    password: String,
    notes: Option<String>,
}

/// Associated data binding a record to its credential and key version.
pub fn build_aad(domain: &str, username: &str, id: Uuid, version: u32) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_TAG.len() + domain.len() + username.len() + 40);
    for part in [AAD_TAG, domain.as_bytes(), username.as_bytes(), id.as_bytes()] {
        aad.extend_from_slice(&(part.len() as u32).to_be_bytes());
        aad.extend_from_slice(part);
    }
    aad.extend_from_slice(&version.to_be_bytes());
    aad
}

impl StoredCredential {
    /// Encrypt `credential` under `cdk` as a record of `version`.
    pub fn seal(
        credential: &Credential,
        cdk: &ContentKey,
        version: u32,
    ) -> Result<Self, StrongboxError> {
        let payload = SecretPayload {
            password: credential.password.expose_secret().to_owned(),
            notes: credential.notes.clone(),
        };
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&payload).map_err(|e| StrongboxError::Internal(e.to_string()))?,
        );
        let aad = build_aad(&credential.domain, &credential.username, credential.id, version);
        let record = crypto::encrypt(&plaintext, cdk.as_bytes(), &aad, version)?;

        Ok(Self {
            id: credential.id,
            domain: credential.domain.clone(),
            username: credential.username.clone(),
            created_at: credential.created_at,
            modified_at: credential.modified_at,
            record,
        })
    }

    /// Verify and decrypt with `cdk`, expecting a record of `version`.
    ///
    /// A record whose identity fields were edited at rest fails here with
    /// `IntegrityViolation` even though its own digest is intact.
    pub fn open(&self, cdk: &ContentKey, version: u32) -> Result<Credential, StrongboxError> {
        if self.record.version != version {
            return Err(StrongboxError::IntegrityViolation(format!(
                "record version {} does not match key version {version}",
                self.record.version
            )));
        }
        let expected = build_aad(&self.domain, &self.username, self.id, version);
        if !crypto::constant_time_eq(&expected, &self.record.aad) {
            return Err(StrongboxError::IntegrityViolation(
                "associated data does not match credential identity".to_string(),
            ));
        }

        let plaintext = crypto::decrypt(&self.record, cdk.as_bytes())?;
        let mut payload: SecretPayload = serde_json::from_slice(&plaintext)
            .map_err(|e| StrongboxError::MalformedRecord(format!("credential payload: {e}")))?;

        Ok(Credential {
            id: self.id,
            domain: self.domain.clone(),
            username: self.username.clone(),
            password: SecretString::from(std::mem::take(&mut payload.password)),
            notes: payload.notes.take(),
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StrongboxError> {
        serde_json::to_vec(self).map_err(|e| StrongboxError::Internal(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StrongboxError> {
        serde_json::from_slice(bytes)
            .map_err(|e| StrongboxError::MalformedRecord(format!("credential envelope: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::derive_cdk;

    fn cdk(fill: u8) -> ContentKey {
        derive_cdk(&[fill; 32], &[3u8; 32], "test").unwrap()
    }

    fn sample() -> Credential {
        Credential::new("example.com", "alice", SecretString::from("P@ss1")).with_notes("2fa on")
    }

    #[test]
    fn seal_open_roundtrip() {
        let cred = sample();
        let stored = StoredCredential::seal(&cred, &cdk(1), 1).unwrap();
        let opened = stored.open(&cdk(1), 1).unwrap();
        assert_eq!(opened.password.expose_secret(), "P@ss1");
        assert_eq!(opened.notes.as_deref(), Some("2fa on"));
        assert_eq!(opened.domain, "example.com");
        assert_eq!(opened.id, cred.id);
    }

    #[test]
    fn envelope_never_contains_plaintext_secret() {
        let stored = StoredCredential::seal(&sample(), &cdk(1), 1).unwrap();
        let bytes = stored.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("P@ss1"));
        assert!(!text.contains("2fa on"));
        let back = StoredCredential::from_bytes(&bytes).unwrap();
        assert_eq!(back.open(&cdk(1), 1).unwrap().password.expose_secret(), "P@ss1");
    }

    #[test]
    fn edited_username_is_integrity_violation() {
        let mut stored = StoredCredential::seal(&sample(), &cdk(1), 1).unwrap();
        stored.username = "mallory".to_string();
        assert!(matches!(
            stored.open(&cdk(1), 1),
            Err(StrongboxError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn swapped_id_is_integrity_violation() {
        let mut stored = StoredCredential::seal(&sample(), &cdk(1), 1).unwrap();
        stored.id = Uuid::new_v4();
        assert!(matches!(
            stored.open(&cdk(1), 1),
            Err(StrongboxError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn wrong_version_is_integrity_violation() {
        let stored = StoredCredential::seal(&sample(), &cdk(1), 1).unwrap();
        assert!(matches!(
            stored.open(&cdk(1), 2),
            Err(StrongboxError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn wrong_key_is_integrity_violation() {
        let stored = StoredCredential::seal(&sample(), &cdk(1), 1).unwrap();
        assert!(matches!(
            stored.open(&cdk(2), 1),
            Err(StrongboxError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn garbage_envelope_is_malformed() {
        assert!(matches!(
            StoredCredential::from_bytes(b"not json"),
            Err(StrongboxError::MalformedRecord(_))
        ));
    }

    #[test]
    fn aad_is_length_prefixed() {
        let id = Uuid::nil();
        assert_ne!(build_aad("ab", "c", id, 1), build_aad("a", "bc", id, 1));
        assert_ne!(build_aad("a", "b", id, 1), build_aad("a", "b", id, 2));
    }
}
