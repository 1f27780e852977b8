// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strongbox vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Strongbox configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrongboxConfig {
    /// Unlocked-session lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Key hierarchy and rotation policy.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Alternate PIN unlock path.
    #[serde(default)]
    pub pin: PinConfig,

    /// Device passcode presence authenticator.
    #[serde(default)]
    pub passcode: PasscodeConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds an unlocked session stays valid without activity (default: 300).
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// Reset the expiry on every successful credential operation.
    #[serde(default = "default_extend_on_access")]
    pub extend_on_access: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout(),
            extend_on_access: default_extend_on_access(),
        }
    }
}

fn default_session_timeout() -> u64 {
    300
}

fn default_extend_on_access() -> bool {
    true
}

/// Vault key-hierarchy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Days after which `stats` reports the key as due for rotation (default: 90).
    #[serde(default = "default_rotation_interval_days")]
    pub rotation_interval_days: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            rotation_interval_days: default_rotation_interval_days(),
        }
    }
}

fn default_rotation_interval_days() -> u32 {
    90
}

/// PIN unlock configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    /// PBKDF2-HMAC-SHA256 iteration count (default: 310000).
    #[serde(default = "default_pin_iterations")]
    pub iterations: u32,

    /// Failed PIN attempts before the PIN path locks out (default: 5).
    #[serde(default = "default_pin_max_attempts")]
    pub max_attempts: u32,

    /// Lockout duration in seconds (default: 300).
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,

    /// Minimum accepted PIN length (default: 4).
    #[serde(default = "default_pin_min_length")]
    pub min_length: usize,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            iterations: default_pin_iterations(),
            max_attempts: default_pin_max_attempts(),
            lockout_secs: default_lockout_secs(),
            min_length: default_pin_min_length(),
        }
    }
}

/// Lower bound enforced by validation for PIN key derivation.
pub const MIN_PIN_ITERATIONS: u32 = 300_000;

fn default_pin_iterations() -> u32 {
    310_000 // OWASP guidance for PBKDF2-HMAC-SHA256
}

fn default_pin_max_attempts() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    300
}

fn default_pin_min_length() -> usize {
    4
}

/// Passcode presence authenticator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PasscodeConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,

    /// Failed passcode checks before lockout (default: 5).
    #[serde(default = "default_passcode_max_failed")]
    pub max_failed_attempts: u32,

    /// Lockout duration in seconds (default: 300).
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
}

impl Default for PasscodeConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
            max_failed_attempts: default_passcode_max_failed(),
            lockout_secs: default_lockout_secs(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

fn default_passcode_max_failed() -> u32 {
    5
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("strongbox").join("strongbox.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("strongbox.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
