// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value store with fault injection.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use strongbox_core::{KeyValueStore, Namespace, StrongboxError};

type FaultPredicate = Box<dyn Fn(Namespace, &str) -> bool + Send + Sync>;

/// A `BTreeMap`-backed store. Writes matching an installed predicate fail with
/// a storage error and leave the map untouched.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<(Namespace, String), Vec<u8>>>,
    failing_puts: Mutex<Option<FaultPredicate>>,
    put_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` for which `predicate(namespace, key)` holds fail.
    pub fn fail_puts_when<F>(&self, predicate: F)
    where
        F: Fn(Namespace, &str) -> bool + Send + Sync + 'static,
    {
        *self.failing_puts.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(predicate));
    }

    pub fn clear_faults(&self) {
        *self.failing_puts.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    /// Read a value without going through the async trait.
    pub fn raw_get(&self, namespace: Namespace, key: &str) -> Option<Vec<u8>> {
        self.lock().get(&(namespace, key.to_string())).cloned()
    }

    /// Overwrite a value directly, bypassing fault injection.
    pub fn raw_put(&self, namespace: Namespace, key: &str, value: Vec<u8>) {
        self.lock().insert((namespace, key.to_string()), value);
    }

    /// Keys present in `namespace`, sorted.
    pub fn raw_keys(&self, namespace: Namespace) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(Namespace, String), Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn should_fail(&self, namespace: Namespace, key: &str) -> bool {
        self.failing_puts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|p| p(namespace, key))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, namespace: Namespace, key: &str, value: &[u8]) -> Result<(), StrongboxError> {
        if self.should_fail(namespace, key) {
            return Err(StrongboxError::storage(format!(
                "injected write failure for {namespace}/{key}"
            )));
        }
        self.lock().insert((namespace, key.to_string()), value.to_vec());
        self.put_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Vec<u8>>, StrongboxError> {
        Ok(self.raw_get(namespace, key))
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StrongboxError> {
        self.lock().remove(&(namespace, key.to_string()));
        Ok(())
    }

    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StrongboxError> {
        Ok(self.lock().contains_key(&(namespace, key.to_string())))
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StrongboxError> {
        Ok(self.raw_keys(namespace))
    }
}
