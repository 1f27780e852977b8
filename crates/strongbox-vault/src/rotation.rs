// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! All-or-nothing key rotation.
//!
//! Rotation stages a complete second generation of records under
//! `"<new_version>/<id>"` keys, verifies each staged record by reading it
//! back and decrypting it, and only then commits by writing vault metadata
//! with the new `current_version` in one store write. Before that write
//! nothing reads the staged generation; after it nothing reads the old one.
//! A failure anywhere before the commit discards the staged generation and
//! the new KEK, leaving the vault byte-for-byte as it was.

use strongbox_core::{Namespace, PresenceProof, StrongboxError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::credential::StoredCredential;
use crate::engine::VaultEngine;
use crate::hierarchy::RotationKeys;
use crate::kdf::ContentKey;
use crate::metadata::{VaultMetadata, record_key, record_prefix};
use crate::pin::{self, PinSecret, PinSecretEnvelope};

/// Outcome of a committed rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub old_version: u32,
    pub new_version: u32,
    pub migrated: usize,
}

impl VaultEngine {
    /// Generate a new KEK and migrate every credential to it.
    ///
    /// Requires a presence check but not an unlocked session. If any
    /// credential cannot be migrated the whole rotation is abandoned with
    /// [`StrongboxError::KeyRotationFailed`].
    pub async fn rotate_key(&self) -> Result<RotationReport, StrongboxError> {
        let mut state = self.state.lock().await;
        let mut meta = VaultMetadata::require(&*self.store).await?;
        let proof = self.authenticate("Rotate the vault encryption key").await?;
        let keys = self.hierarchy.rotate(meta.current_version, &proof).await?;
        let (old_version, new_version) = (keys.old_version, keys.new_version);

        let new_cdk = match self.stage_generation(&meta, &keys, &proof).await {
            Ok(cdk) => cdk,
            Err(err) => {
                error!(old_version, new_version, error = %err, "key rotation aborted");
                self.discard_generation(new_version).await;
                return Err(err);
            }
        };

        let now = self.clock.now();
        meta.current_version = new_version;
        meta.last_rotation = Some(now);
        meta.touch(now);
        if let Err(err) = meta.save(&*self.store).await {
            error!(old_version, new_version, error = %err, "key rotation commit failed");
            self.discard_generation(new_version).await;
            return Err(err);
        }

        let migrated = meta.credential_index.len();
        info!(old_version, new_version, migrated, "key rotation committed");
        state.session.replace_cdk(new_cdk, new_version);
        self.retire_generation(old_version).await;

        Ok(RotationReport {
            old_version,
            new_version,
            migrated,
        })
    }

    /// Re-encrypt every indexed credential under the new CDK.
    ///
    /// Attempts all of them so the error reports the full failure count.
    async fn stage_generation(
        &self,
        meta: &VaultMetadata,
        keys: &RotationKeys,
        proof: &PresenceProof,
    ) -> Result<ContentKey, StrongboxError> {
        // The proof is short-lived; spend it before the slow credential pass.
        let pin_secret = if meta.pin_enabled {
            Some(self.recover_pin_secret(proof).await?)
        } else {
            None
        };

        let old_cdk = self
            .hierarchy
            .derive_cdk(&keys.old_kek, keys.old_version)
            .await?;
        let new_cdk = self
            .hierarchy
            .derive_cdk(&keys.new_kek, keys.new_version)
            .await?;

        let mut failed_count = 0;
        for &id in &meta.credential_index {
            if let Err(err) = self.restage(id, &old_cdk, &new_cdk, keys).await {
                failed_count += 1;
                warn!(target: "strongbox::security", %id, error = %err, "credential failed to migrate");
            }
        }
        if failed_count > 0 {
            return Err(StrongboxError::KeyRotationFailed { failed_count });
        }

        if let Some(secret) = &pin_secret {
            pin::store_kek(&*self.store, secret, &keys.new_kek, keys.new_version).await?;
        }
        Ok(new_cdk)
    }

    async fn restage(
        &self,
        id: Uuid,
        old_cdk: &ContentKey,
        new_cdk: &ContentKey,
        keys: &RotationKeys,
    ) -> Result<(), StrongboxError> {
        let credential = self.open_record(old_cdk, keys.old_version, id).await?;
        let staged = StoredCredential::seal(&credential, new_cdk, keys.new_version)?;
        let key = record_key(keys.new_version, id);
        self.store
            .put(Namespace::Credentials, &key, &staged.to_bytes()?)
            .await?;

        // Read back so a lossy store cannot let an unreadable record through.
        self.open_record(new_cdk, keys.new_version, id).await?;
        Ok(())
    }

    /// Recover the PIN secret through its hardware-wrapped copy.
    async fn recover_pin_secret(&self, proof: &PresenceProof) -> Result<PinSecret, StrongboxError> {
        let envelope = PinSecretEnvelope::load(&*self.store)
            .await?
            .ok_or(StrongboxError::PinNotEnabled)?;
        let secret_bytes = self
            .hardware
            .unwrap(&envelope.hardware_wrapped_secret, proof)
            .await?;
        PinSecret::from_slice(&secret_bytes)
    }

    /// Remove everything staged for an uncommitted version.
    async fn discard_generation(&self, version: u32) {
        self.sweep_records(version).await;
        if let Err(err) = pin::delete_kek(&*self.store, version).await {
            warn!(version, error = %err, "failed to remove staged PIN key");
        }
        if let Err(err) = self.hierarchy.discard_version(version).await {
            warn!(version, error = %err, "failed to discard staged KEK");
        }
    }

    /// Clean up a superseded version after commit. Failures leave only
    /// unreachable data behind.
    async fn retire_generation(&self, version: u32) {
        self.sweep_records(version).await;
        if let Err(err) = pin::delete_kek(&*self.store, version).await {
            warn!(version, error = %err, "failed to remove superseded PIN key");
        }
        if let Err(err) = self.hierarchy.deprecate(version).await {
            warn!(version, error = %err, "failed to deprecate superseded KEK");
        }
    }

    async fn sweep_records(&self, version: u32) {
        let prefix = record_prefix(version);
        let keys = match self.store.keys(Namespace::Credentials).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(version, error = %err, "failed to enumerate records for cleanup");
                return;
            }
        };
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            if let Err(err) = self.store.delete(Namespace::Credentials, key).await {
                warn!(version, key = %key, error = %err, "failed to remove record");
            }
        }
    }
}
