// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes.

use crate::diagnostic::ConfigError;
use crate::model::{StrongboxConfig, MIN_PIN_ITERATIONS};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors (does not fail fast).
pub fn validate_config(config: &StrongboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.session.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.vault.rotation_interval_days == 0 {
        errors.push(ConfigError::Validation {
            message: "vault.rotation_interval_days must be at least 1".to_string(),
        });
    }

    if config.pin.iterations < MIN_PIN_ITERATIONS {
        errors.push(ConfigError::Validation {
            message: format!(
                "pin.iterations must be at least {MIN_PIN_ITERATIONS}, got {}",
                config.pin.iterations
            ),
        });
    }

    if config.pin.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "pin.max_attempts must be at least 1".to_string(),
        });
    }

    if config.pin.min_length < 4 {
        errors.push(ConfigError::Validation {
            message: format!(
                "pin.min_length must be at least 4, got {}",
                config.pin.min_length
            ),
        });
    }

    if config.passcode.kdf_memory_cost < 32768 {
        errors.push(ConfigError::Validation {
            message: format!(
                "passcode.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.passcode.kdf_memory_cost
            ),
        });
    }

    if config.passcode.kdf_iterations < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "passcode.kdf_iterations must be at least 2, got {}",
                config.passcode.kdf_iterations
            ),
        });
    }

    if config.passcode.kdf_parallelism < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "passcode.kdf_parallelism must be at least 1, got {}",
                config.passcode.kdf_parallelism
            ),
        });
    }

    if config.passcode.max_failed_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "passcode.max_failed_attempts must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
