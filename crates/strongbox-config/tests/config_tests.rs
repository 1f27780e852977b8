// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Strongbox configuration system.

use strongbox_config::diagnostic::ConfigError;
use strongbox_config::model::StrongboxConfig;
use strongbox_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[session]
timeout_secs = 120
extend_on_access = false

[vault]
rotation_interval_days = 30

[pin]
iterations = 400000
max_attempts = 3
lockout_secs = 60
min_length = 6

[passcode]
kdf_memory_cost = 32768
kdf_iterations = 2
kdf_parallelism = 1
max_failed_attempts = 4
lockout_secs = 90

[storage]
database_path = "/tmp/strongbox-test.db"
wal_mode = false

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.session.timeout_secs, 120);
    assert!(!config.session.extend_on_access);
    assert_eq!(config.vault.rotation_interval_days, 30);
    assert_eq!(config.pin.iterations, 400_000);
    assert_eq!(config.pin.max_attempts, 3);
    assert_eq!(config.pin.lockout_secs, 60);
    assert_eq!(config.pin.min_length, 6);
    assert_eq!(config.passcode.kdf_memory_cost, 32768);
    assert_eq!(config.passcode.max_failed_attempts, 4);
    assert_eq!(config.storage.database_path, "/tmp/strongbox-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    let defaults = StrongboxConfig::default();
    assert_eq!(config.session.timeout_secs, 300);
    assert_eq!(config.pin.iterations, defaults.pin.iterations);
    assert_eq!(config.vault.rotation_interval_days, 90);
    assert!(config.storage.database_path.ends_with("strongbox.db"));
}

#[test]
fn unknown_field_in_session_produces_suggestion() {
    let toml = r#"
[session]
timout_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "timout_secs");
            assert_eq!(suggestion.as_deref(), Some("timeout_secs"));
        }
        other => panic!("expected UnknownKey, got: {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[sync]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[session]
timeout_secs = "five minutes"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType, got: {errors:?}"
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[pin]
iterations = 1000
"#;

    let errors = load_and_validate_str(toml).expect_err("weak PIN KDF should fail validation");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}
