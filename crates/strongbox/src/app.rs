// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the vault engine to the SQLite store and software adapters.

use std::sync::Arc;

use strongbox_config::StrongboxConfig;
use strongbox_core::{Clock, KeyValueStore, StrongboxError, SystemClock};
use strongbox_storage::SqliteStore;
use strongbox_vault::{
    Collaborators, EngineSettings, PasscodeAuthenticator, Pbkdf2PinProvider, SoftwareKeyAdapter,
    TtyPrompt, VaultEngine,
};
use tracing::debug;

pub struct App {
    pub engine: VaultEngine,
    pub passcode: Arc<PasscodeAuthenticator>,
}

impl App {
    pub async fn open(config: &StrongboxConfig) -> Result<Self, StrongboxError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.storage).await?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let passcode = Arc::new(PasscodeAuthenticator::new(
            store.clone(),
            clock.clone(),
            Arc::new(TtyPrompt),
            config.passcode.clone(),
        ));
        let engine = VaultEngine::new(
            Collaborators {
                store: store.clone(),
                hardware: Arc::new(SoftwareKeyAdapter::new(store, clock.clone())),
                authenticator: passcode.clone(),
                pin_provider: Arc::new(Pbkdf2PinProvider::new(config.pin.iterations)?),
                clock,
            },
            EngineSettings::from(config),
        );
        debug!(path = %config.storage.database_path, "vault opened");

        Ok(Self { engine, passcode })
    }
}
