// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable key-value store trait.

use async_trait::async_trait;

use crate::error::StrongboxError;
use crate::types::Namespace;

/// A reliable `namespace/key -> bytes` store.
///
/// Each single-key write is atomic. No multi-key transactions are offered;
/// the vault engine builds its own atomicity on top of single-key writes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace the value at `namespace/key`.
    async fn put(&self, namespace: Namespace, key: &str, value: &[u8]) -> Result<(), StrongboxError>;

    /// Fetch the value at `namespace/key`, or `None` if absent.
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Vec<u8>>, StrongboxError>;

    /// Remove `namespace/key`. Removing an absent key is not an error.
    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StrongboxError>;

    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StrongboxError>;

    /// All keys currently present in `namespace`, sorted.
    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StrongboxError>;
}
