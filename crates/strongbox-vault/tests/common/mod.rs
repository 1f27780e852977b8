// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for vault integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;
use strongbox_core::PresenceAuthenticator;
use strongbox_test_utils::{
    FakeHardwareKeyAdapter, ManualClock, MemoryStore, ScriptedAuthenticator,
};
use strongbox_vault::{
    Collaborators, Credential, EngineSettings, KeyHierarchy, Pbkdf2PinProvider, VaultEngine,
};

pub const TEST_PIN_ITERATIONS: u32 = 1_000;

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub hardware: Arc<FakeHardwareKeyAdapter>,
    pub auth: Arc<ScriptedAuthenticator>,
    pub engine: VaultEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryStore::new());
        let hardware = Arc::new(FakeHardwareKeyAdapter::new(clock.clone()));
        let auth = Arc::new(ScriptedAuthenticator::new(clock.clone()));
        let pin_provider = Arc::new(Pbkdf2PinProvider::new(TEST_PIN_ITERATIONS).unwrap());

        let engine = VaultEngine::new(
            Collaborators {
                store: store.clone(),
                hardware: hardware.clone(),
                authenticator: auth.clone(),
                pin_provider,
                clock: clock.clone(),
            },
            settings,
        );

        Self {
            clock,
            store,
            hardware,
            auth,
            engine,
        }
    }

    /// A harness whose vault has been created and is unlocked.
    pub async fn initialized() -> Self {
        let harness = Self::new();
        harness.engine.initialize_vault().await.unwrap();
        harness
    }

    /// A second engine over the same store and devices, as a separate
    /// process would open it. Starts locked.
    pub fn sibling_engine(&self) -> VaultEngine {
        VaultEngine::new(
            Collaborators {
                store: self.store.clone(),
                hardware: self.hardware.clone(),
                authenticator: self.auth.clone(),
                pin_provider: Arc::new(Pbkdf2PinProvider::new(TEST_PIN_ITERATIONS).unwrap()),
                clock: self.clock.clone(),
            },
            EngineSettings::default(),
        )
    }

    /// Independent view of the key hierarchy over the same store and hardware.
    pub fn hierarchy(&self) -> KeyHierarchy {
        KeyHierarchy::new(self.hardware.clone(), self.store.clone(), self.clock.clone())
    }

    /// Obtain a fresh proof outside the engine.
    pub async fn proof(&self) -> strongbox_core::PresenceProof {
        self.auth.authenticate("test harness").await.unwrap()
    }
}

pub fn credential(domain: &str, username: &str, password: &str) -> Credential {
    Credential::new(domain, username, SecretString::from(password.to_string()))
}
