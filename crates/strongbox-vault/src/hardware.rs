// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Software stand-in for a secure-element key adapter.
//!
//! The device key is a random AES-256 key kept in [`Namespace::Device`] of
//! the local store. It offers the same wrap/unwrap contract as a hardware
//! enclave, including the presence-proof gate on unwrap, but it cannot stop
//! an attacker who can read the database file and the verifier together.

use std::sync::Arc;

use async_trait::async_trait;
use ring::aead::NONCE_LEN;
use strongbox_core::{
    Clock, HardwareKeyAdapter, KeyValueStore, Namespace, PresenceProof, StrongboxError,
};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN};

const DEVICE_KEY: &str = "key";
const WRAP_AAD: &[u8] = b"strongbox-device-wrap-v1";

pub struct SoftwareKeyAdapter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl SoftwareKeyAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn device_key(&self, create: bool) -> Result<Zeroizing<[u8; KEY_LEN]>, StrongboxError> {
        if let Some(raw) = self.store.get(Namespace::Device, DEVICE_KEY).await? {
            let raw = Zeroizing::new(raw);
            let key: [u8; KEY_LEN] = raw
                .as_slice()
                .try_into()
                .map_err(|_| StrongboxError::KeySizeInvalid { len: raw.len() })?;
            return Ok(Zeroizing::new(key));
        }
        if !create {
            return Err(StrongboxError::Internal(
                "device key is missing; the vault must be reset".to_string(),
            ));
        }

        let key = crypto::generate_random_key()?;
        self.store
            .put(Namespace::Device, DEVICE_KEY, key.as_ref())
            .await?;
        info!("device key created");
        Ok(key)
    }
}

#[async_trait]
impl HardwareKeyAdapter for SoftwareKeyAdapter {
    async fn is_available(&self) -> bool {
        self.store.keys(Namespace::Device).await.is_ok()
    }

    async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        let key = self.device_key(true).await?;
        let (sealed, nonce) = crypto::seal(&key, plaintext, WRAP_AAD)?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    async fn unwrap(
        &self,
        wrapped: &[u8],
        proof: &PresenceProof,
    ) -> Result<Zeroizing<Vec<u8>>, StrongboxError> {
        if !proof.is_fresh_at(self.clock.now()) {
            debug!(proof = %proof.id(), "rejected stale presence proof");
            return Err(StrongboxError::HardwarePresenceRequired);
        }
        if wrapped.len() < NONCE_LEN {
            return Err(StrongboxError::MalformedRecord(
                "wrapped key too short".to_string(),
            ));
        }
        let key = self.device_key(false).await?;
        let (nonce, sealed) = wrapped.split_at(NONCE_LEN);
        crypto::open(&key, nonce, sealed, WRAP_AAD)
    }

    async fn delete_key(&self) -> Result<(), StrongboxError> {
        self.store.delete(Namespace::Device, DEVICE_KEY).await?;
        info!("device key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strongbox_test_utils::{ManualClock, MemoryStore};

    use super::*;

    fn adapter() -> (Arc<ManualClock>, Arc<MemoryStore>, SoftwareKeyAdapter) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryStore::new());
        let adapter = SoftwareKeyAdapter::new(store.clone(), clock.clone());
        (clock, store, adapter)
    }

    #[tokio::test]
    async fn wrap_creates_device_key_lazily() {
        let (clock, store, hw) = adapter();
        assert!(store.raw_get(Namespace::Device, DEVICE_KEY).is_none());

        let wrapped = hw.wrap(b"0123456789abcdef0123456789abcdef").await.unwrap();
        assert!(store.raw_get(Namespace::Device, DEVICE_KEY).is_some());

        let proof = PresenceProof::issue("test", clock.now());
        let plain = hw.unwrap(&wrapped, &proof).await.unwrap();
        assert_eq!(plain.as_slice(), b"0123456789abcdef0123456789abcdef");
    }

    #[tokio::test]
    async fn stale_proof_rejected() {
        let (clock, _, hw) = adapter();
        let wrapped = hw.wrap(b"kek").await.unwrap();
        let proof = PresenceProof::issue("test", clock.now());
        clock.advance_secs(31);
        assert!(matches!(
            hw.unwrap(&wrapped, &proof).await,
            Err(StrongboxError::HardwarePresenceRequired)
        ));
    }

    #[tokio::test]
    async fn deleted_key_cannot_unwrap() {
        let (clock, _, hw) = adapter();
        let wrapped = hw.wrap(b"kek").await.unwrap();
        hw.delete_key().await.unwrap();

        let proof = PresenceProof::issue("test", clock.now());
        assert!(hw.unwrap(&wrapped, &proof).await.is_err());
    }

    #[tokio::test]
    async fn tampered_blob_is_integrity_violation() {
        let (clock, _, hw) = adapter();
        let mut wrapped = hw.wrap(b"kek").await.unwrap();
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;

        let proof = PresenceProof::issue("test", clock.now());
        assert!(matches!(
            hw.unwrap(&wrapped, &proof).await,
            Err(StrongboxError::IntegrityViolation(_))
        ));
    }
}
