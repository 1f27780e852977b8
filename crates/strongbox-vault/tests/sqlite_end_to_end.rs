// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full stack over SQLite with the software key adapter.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use strongbox_config::model::StorageConfig;
use strongbox_core::{Clock, SystemClock};
use strongbox_storage::SqliteStore;
use strongbox_test_utils::ScriptedAuthenticator;
use strongbox_vault::{
    Collaborators, Credential, EngineSettings, Pbkdf2PinProvider, SoftwareKeyAdapter, VaultEngine,
};

async fn engine_at(path: &str) -> VaultEngine {
    let config = StorageConfig {
        database_path: path.to_string(),
        wal_mode: true,
    };
    let store = Arc::new(SqliteStore::open(&config).await.unwrap());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    VaultEngine::new(
        Collaborators {
            store: store.clone(),
            hardware: Arc::new(SoftwareKeyAdapter::new(store, clock.clone())),
            authenticator: Arc::new(ScriptedAuthenticator::new(clock.clone())),
            pin_provider: Arc::new(Pbkdf2PinProvider::new(1_000).unwrap()),
            clock,
        },
        EngineSettings::default(),
    )
}

#[tokio::test]
async fn vault_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let path = path.to_str().unwrap();

    let cred = Credential::new("example.com", "alice", SecretString::from("P@ss1"));
    {
        let engine = engine_at(path).await;
        engine.initialize_vault().await.unwrap();
        engine.save(&cred).await.unwrap();
    }

    let engine = engine_at(path).await;
    assert!(engine.is_initialized().await.unwrap());
    assert!(!engine.is_unlocked().await);
    engine.unlock().await.unwrap();
    assert_eq!(engine.retrieve(cred.id).await.unwrap().expose_secret(), "P@ss1");
}

#[tokio::test]
async fn rotation_and_pin_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let path = path.to_str().unwrap();

    let engine = engine_at(path).await;
    engine.initialize_vault().await.unwrap();
    let creds: Vec<_> = (0..5)
        .map(|i| Credential::new(format!("site{i}.example"), "user", SecretString::from(format!("pw-{i}"))))
        .collect();
    for c in &creds {
        engine.save(c).await.unwrap();
    }
    let pin = SecretString::from("4821");
    engine.enable_pin(&pin).await.unwrap();

    let report = engine.rotate_key().await.unwrap();
    assert_eq!((report.old_version, report.new_version, report.migrated), (1, 2, 5));
    drop(engine);

    let engine = engine_at(path).await;
    engine.unlock_with_pin(&pin).await.unwrap();
    let listed = engine.list().await.unwrap();
    assert_eq!(listed.skipped, 0);
    assert_eq!(listed.credentials.len(), 5);
    for c in &creds {
        assert_eq!(
            engine.retrieve(c.id).await.unwrap().expose_secret(),
            c.password.expose_secret()
        );
    }
}

#[tokio::test]
async fn reset_then_reinitialize_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let path = path.to_str().unwrap();

    let engine = engine_at(path).await;
    engine.initialize_vault().await.unwrap();
    engine
        .save(&Credential::new("a.example", "ann", SecretString::from("pw")))
        .await
        .unwrap();
    engine.reset_vault().await.unwrap();
    assert!(!engine.is_initialized().await.unwrap());

    engine.initialize_vault().await.unwrap();
    assert_eq!(engine.list().await.unwrap().credentials.len(), 0);
}
