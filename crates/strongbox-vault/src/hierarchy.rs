// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned key-encryption keys, hardware-wrapped at rest.
//!
//! Each KEK version has a wrapped-key record in [`Namespace::Kek`] and a
//! per-version HKDF salt in [`Namespace::Salt`], both keyed by the decimal
//! version number. Plaintext KEKs exist only transiently in memory.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_core::{
    Clock, HardwareKeyAdapter, KeyValueStore, Namespace, PresenceProof, StrongboxError,
};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN};
use crate::kdf::{self, ContentKey, SALT_LEN};

/// A plaintext key-encryption key. Zeroized on drop.
pub struct Kek(Zeroizing<[u8; KEY_LEN]>);

impl Kek {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, StrongboxError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| StrongboxError::KeySizeInvalid { len: bytes.len() })?;
        Ok(Self(Zeroizing::new(arr)))
    }
}

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Kek([REDACTED])")
    }
}

/// Lifecycle state of a stored KEK version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KekStatus {
    Active,
    Deprecated,
}

/// Persisted form of one KEK version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KekRecord {
    pub version: u32,
    #[serde(with = "crate::encoding::b64")]
    pub wrapped_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub status: KekStatus,
}

/// Key material produced by a rotation.
#[derive(Debug)]
pub struct RotationKeys {
    pub old_version: u32,
    pub new_version: u32,
    pub old_kek: Kek,
    pub new_kek: Kek,
}

/// Manages creation, unwrapping, and rotation of KEK versions.
pub struct KeyHierarchy {
    hardware: Arc<dyn HardwareKeyAdapter>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

fn version_key(version: u32) -> String {
    version.to_string()
}

impl KeyHierarchy {
    pub fn new(
        hardware: Arc<dyn HardwareKeyAdapter>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hardware,
            store,
            clock,
        }
    }

    /// True once any KEK version has been persisted.
    pub async fn is_initialized(&self) -> Result<bool, StrongboxError> {
        Ok(!self.store.keys(Namespace::Kek).await?.is_empty())
    }

    /// All stored KEK versions, ascending.
    pub async fn versions(&self) -> Result<Vec<u32>, StrongboxError> {
        let mut versions: Vec<u32> = self
            .store
            .keys(Namespace::Kek)
            .await?
            .iter()
            .filter_map(|k| k.parse().ok())
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// Create KEK version 1. Fails if any KEK already exists.
    pub async fn initialize(&self, proof: &PresenceProof) -> Result<Kek, StrongboxError> {
        if self.is_initialized().await? {
            return Err(StrongboxError::AlreadyInitialized);
        }
        self.require_hardware().await?;
        if !proof.is_fresh_at(self.clock.now()) {
            return Err(StrongboxError::HardwarePresenceRequired);
        }

        let kek = self.create_version(1).await?;
        info!(version = 1, "key hierarchy initialized");
        Ok(kek)
    }

    /// Load and hardware-unwrap the KEK for `version`.
    pub async fn unwrap_kek(
        &self,
        version: u32,
        proof: &PresenceProof,
    ) -> Result<Kek, StrongboxError> {
        let record = self
            .load_record(version)
            .await?
            .ok_or(StrongboxError::KeyNotFound { version })?;
        self.require_hardware().await?;

        let plaintext = self.hardware.unwrap(&record.wrapped_key, proof).await?;
        let kek = Kek::from_slice(&plaintext)?;
        debug!(version, "KEK unwrapped");
        Ok(kek)
    }

    /// Derive the CDK for `version` using its stored salt.
    pub async fn derive_cdk(&self, kek: &Kek, version: u32) -> Result<ContentKey, StrongboxError> {
        let salt = self
            .store
            .get(Namespace::Salt, &version_key(version))
            .await?
            .ok_or(StrongboxError::KeyNotFound { version })?;
        kdf::derive_cdk(kek.as_bytes(), &salt, &kdf::cdk_info(version))
    }

    /// Unwrap the current KEK and persist a fresh one at `current_version + 1`.
    ///
    /// The new version is staged only; nothing treats it as current until the
    /// caller commits vault metadata. On abort call [`discard_version`].
    ///
    /// [`discard_version`]: KeyHierarchy::discard_version
    pub async fn rotate(
        &self,
        current_version: u32,
        proof: &PresenceProof,
    ) -> Result<RotationKeys, StrongboxError> {
        let old_kek = self.unwrap_kek(current_version, proof).await?;
        let new_version = current_version
            .checked_add(1)
            .ok_or_else(|| StrongboxError::Internal("key version overflow".to_string()))?;
        let new_kek = self.create_version(new_version).await?;
        info!(
            old_version = current_version,
            new_version, "new KEK version staged"
        );

        Ok(RotationKeys {
            old_version: current_version,
            new_version,
            old_kek,
            new_kek,
        })
    }

    /// Remove a staged version after an aborted rotation.
    pub async fn discard_version(&self, version: u32) -> Result<(), StrongboxError> {
        self.store.delete(Namespace::Kek, &version_key(version)).await?;
        self.store.delete(Namespace::Salt, &version_key(version)).await?;
        debug!(version, "staged KEK version discarded");
        Ok(())
    }

    /// Mark a superseded version as deprecated.
    pub async fn deprecate(&self, version: u32) -> Result<(), StrongboxError> {
        let Some(mut record) = self.load_record(version).await? else {
            warn!(version, "cannot deprecate missing KEK version");
            return Ok(());
        };
        record.status = KekStatus::Deprecated;
        self.save_record(&record).await
    }

    /// Load the stored record for `version`.
    pub async fn load_record(&self, version: u32) -> Result<Option<KekRecord>, StrongboxError> {
        let Some(raw) = self.store.get(Namespace::Kek, &version_key(version)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&raw)
            .map_err(|e| StrongboxError::MalformedRecord(format!("KEK record: {e}")))?;
        Ok(Some(record))
    }

    /// Delete every KEK and salt, then the device key itself.
    pub async fn wipe(&self) -> Result<(), StrongboxError> {
        for ns in [Namespace::Kek, Namespace::Salt] {
            for key in self.store.keys(ns).await? {
                self.store.delete(ns, &key).await?;
            }
        }
        self.hardware.delete_key().await?;
        info!("key hierarchy wiped");
        Ok(())
    }

    /// Generate, wrap, and persist a new KEK with its salt.
    ///
    /// The salt is written before the KEK record so a KEK never exists without one.
    async fn create_version(&self, version: u32) -> Result<Kek, StrongboxError> {
        let key = crypto::generate_random_key()?;
        let salt = crypto::random_bytes(SALT_LEN)?;
        let wrapped_key = self.hardware.wrap(key.as_ref()).await?;

        self.store
            .put(Namespace::Salt, &version_key(version), &salt)
            .await?;
        let record = KekRecord {
            version,
            wrapped_key,
            created_at: self.clock.now(),
            status: KekStatus::Active,
        };
        self.save_record(&record).await?;

        Ok(Kek(key))
    }

    async fn save_record(&self, record: &KekRecord) -> Result<(), StrongboxError> {
        let bytes = serde_json::to_vec(record).map_err(StrongboxError::storage)?;
        self.store
            .put(Namespace::Kek, &version_key(record.version), &bytes)
            .await
    }

    async fn require_hardware(&self) -> Result<(), StrongboxError> {
        if self.hardware.is_available().await {
            Ok(())
        } else {
            Err(StrongboxError::HardwareUnavailable)
        }
    }
}
