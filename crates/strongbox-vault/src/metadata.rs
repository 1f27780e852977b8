// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault metadata document and record key layout.
//!
//! The metadata document is the single commit point of the vault: its
//! `current_version` decides which generation of records is live.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_core::{KeyValueStore, Namespace, StrongboxError};
use uuid::Uuid;

const METADATA_KEY: &str = "vault";

/// Storage key of a credential record: `"<version>/<id>"`.
pub fn record_key(version: u32, id: Uuid) -> String {
    format!("{version}/{id}")
}

/// Version prefix of a record key, for sweeping one generation.
pub fn record_prefix(version: u32) -> String {
    format!("{version}/")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    pub current_version: u32,
    pub credential_index: BTreeSet<Uuid>,
    /// Always equal to `credential_index.len()`.
    pub total_credentials: usize,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_rotation: Option<DateTime<Utc>>,
    pub rotation_interval_days: u32,
    #[serde(default)]
    pub pin_enabled: bool,
}

impl VaultMetadata {
    pub fn new(now: DateTime<Utc>, rotation_interval_days: u32) -> Self {
        Self {
            current_version: 1,
            credential_index: BTreeSet::new(),
            total_credentials: 0,
            created_at: now,
            last_modified: now,
            last_rotation: None,
            rotation_interval_days,
            pin_enabled: false,
        }
    }

    /// Add `id` to the index. Returns false if it was already present.
    pub fn insert(&mut self, id: Uuid, now: DateTime<Utc>) -> bool {
        let added = self.credential_index.insert(id);
        self.touch(now);
        added
    }

    /// Remove `id` from the index. Returns false if it was absent.
    pub fn remove(&mut self, id: &Uuid, now: DateTime<Utc>) -> bool {
        let removed = self.credential_index.remove(id);
        self.touch(now);
        removed
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.total_credentials = self.credential_index.len();
        self.last_modified = now;
    }

    /// Whether the key is older than the rotation interval.
    pub fn rotation_due(&self, now: DateTime<Utc>) -> bool {
        let since = self.last_rotation.unwrap_or(self.created_at);
        now - since >= chrono::Duration::days(i64::from(self.rotation_interval_days))
    }

    pub async fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StrongboxError> {
        let Some(raw) = store.get(Namespace::Metadata, METADATA_KEY).await? else {
            return Ok(None);
        };
        let meta = serde_json::from_slice(&raw)
            .map_err(|e| StrongboxError::MalformedRecord(format!("vault metadata: {e}")))?;
        Ok(Some(meta))
    }

    /// Load, mapping absence to `NotInitialized`.
    pub async fn require(store: &dyn KeyValueStore) -> Result<Self, StrongboxError> {
        Self::load(store).await?.ok_or(StrongboxError::NotInitialized)
    }

    /// Persist in a single write.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StrongboxError> {
        let bytes = serde_json::to_vec(self).map_err(StrongboxError::storage)?;
        store.put(Namespace::Metadata, METADATA_KEY, &bytes).await
    }
}
