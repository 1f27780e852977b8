// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fake hardware key adapter backed by an in-memory AES-256-GCM key.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_core::{Clock, HardwareKeyAdapter, PresenceProof, StrongboxError};
use zeroize::Zeroizing;

const WRAP_AAD: &[u8] = b"fake-hardware-wrap";

/// Stand-in for a secure element. The device key lives only in this struct.
pub struct FakeHardwareKeyAdapter {
    clock: Arc<dyn Clock>,
    key: Mutex<Option<[u8; 32]>>,
    available: AtomicBool,
    unwrap_calls: AtomicUsize,
    rng: SystemRandom,
}

impl FakeHardwareKeyAdapter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            key: Mutex::new(None),
            available: AtomicBool::new(true),
            unwrap_calls: AtomicUsize::new(0),
            rng: SystemRandom::new(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful unwraps, i.e. hardware operations that needed presence.
    pub fn unwrap_calls(&self) -> usize {
        self.unwrap_calls.load(Ordering::SeqCst)
    }

    pub fn has_key(&self) -> bool {
        self.key.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn sealing_key(&self, create: bool) -> Result<LessSafeKey, StrongboxError> {
        let mut slot = self.key.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() && create {
            let mut fresh = [0u8; 32];
            self.rng
                .fill(&mut fresh)
                .map_err(|_| StrongboxError::Internal("rng failure".into()))?;
            *slot = Some(fresh);
        }
        let bytes = slot
            .as_ref()
            .ok_or_else(|| StrongboxError::Internal("device key has been deleted".into()))?;
        let unbound = UnboundKey::new(&AES_256_GCM, bytes)
            .map_err(|_| StrongboxError::Internal("bad device key".into()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

#[async_trait]
impl HardwareKeyAdapter for FakeHardwareKeyAdapter {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        if !self.is_available().await {
            return Err(StrongboxError::HardwareUnavailable);
        }
        let key = self.sealing_key(true)?;
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| StrongboxError::Internal("rng failure".into()))?;
        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(WRAP_AAD),
            &mut in_out,
        )
        .map_err(|_| StrongboxError::Internal("wrap failed".into()))?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    async fn unwrap(
        &self,
        wrapped: &[u8],
        proof: &PresenceProof,
    ) -> Result<Zeroizing<Vec<u8>>, StrongboxError> {
        if !self.is_available().await {
            return Err(StrongboxError::HardwareUnavailable);
        }
        if !proof.is_fresh_at(self.clock.now()) {
            return Err(StrongboxError::HardwarePresenceRequired);
        }
        if wrapped.len() < NONCE_LEN {
            return Err(StrongboxError::MalformedRecord("wrapped key too short".into()));
        }
        let key = self.sealing_key(false)?;
        let (nonce, sealed) = wrapped.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| StrongboxError::MalformedRecord("bad nonce".into()))?;
        let mut in_out = Zeroizing::new(sealed.to_vec());
        let len = key
            .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::from(WRAP_AAD), &mut in_out)
            .map_err(|_| StrongboxError::IntegrityViolation("wrapped key rejected".into()))?
            .len();
        in_out.truncate(len);
        self.unwrap_calls.fetch_add(1, Ordering::SeqCst);
        Ok(in_out)
    }

    async fn delete_key(&self) -> Result<(), StrongboxError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn wrap_unwrap_with_fresh_proof() {
        let clock = Arc::new(ManualClock::new());
        let hw = FakeHardwareKeyAdapter::new(clock.clone());
        let wrapped = hw.wrap(b"kek bytes").await.unwrap();
        let proof = PresenceProof::issue("test", clock.now());
        assert_eq!(&*hw.unwrap(&wrapped, &proof).await.unwrap(), b"kek bytes");
        assert_eq!(hw.unwrap_calls(), 1);
    }

    #[tokio::test]
    async fn stale_proof_is_rejected() {
        let clock = Arc::new(ManualClock::new());
        let hw = FakeHardwareKeyAdapter::new(clock.clone());
        let wrapped = hw.wrap(b"kek").await.unwrap();
        let proof = PresenceProof::issue("test", clock.now());
        clock.advance_secs(120);
        assert!(matches!(
            hw.unwrap(&wrapped, &proof).await,
            Err(StrongboxError::HardwarePresenceRequired)
        ));
    }

    #[tokio::test]
    async fn deleted_key_cannot_unwrap() {
        let clock = Arc::new(ManualClock::new());
        let hw = FakeHardwareKeyAdapter::new(clock.clone());
        let wrapped = hw.wrap(b"kek").await.unwrap();
        hw.delete_key().await.unwrap();
        let proof = PresenceProof::issue("test", clock.now());
        assert!(hw.unwrap(&wrapped, &proof).await.is_err());
    }
}
