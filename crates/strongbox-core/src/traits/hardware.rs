// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hardware key adapter trait for wrapping key-encryption keys.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::StrongboxError;
use crate::types::PresenceProof;

/// Wraps and unwraps KEK bytes with a non-exportable, device-bound key.
///
/// The device key is created lazily on first use and persists until
/// [`delete_key`](HardwareKeyAdapter::delete_key) is called during a vault
/// reset. Its bytes are never exposed.
#[async_trait]
pub trait HardwareKeyAdapter: Send + Sync {
    /// Whether the secure key store can currently be used.
    async fn is_available(&self) -> bool;

    /// Wrap `plaintext` under the device key. Does not require presence.
    async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError>;

    /// Unwrap a blob produced by [`wrap`](HardwareKeyAdapter::wrap).
    ///
    /// Fails with [`StrongboxError::HardwarePresenceRequired`] if `proof` is
    /// stale or otherwise unacceptable.
    async fn unwrap(
        &self,
        wrapped: &[u8],
        proof: &PresenceProof,
    ) -> Result<Zeroizing<Vec<u8>>, StrongboxError>;

    /// Destroy the device key. Everything wrapped under it becomes unreadable.
    async fn delete_key(&self) -> Result<(), StrongboxError>;
}
