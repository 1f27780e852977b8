// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./strongbox.toml` > `~/.config/strongbox/strongbox.toml`
//! > `/etc/strongbox/strongbox.toml`, with `STRONGBOX_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::StrongboxConfig;

/// Config sections, used to map `STRONGBOX_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: [&str; 6] = ["session", "vault", "pin", "passcode", "storage", "logging"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/strongbox/strongbox.toml`
/// 3. `~/.config/strongbox/strongbox.toml`
/// 4. `./strongbox.toml`
/// 5. `STRONGBOX_*` environment variables
pub fn load_config() -> Result<StrongboxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file("/etc/strongbox/strongbox.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("strongbox/strongbox.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("strongbox.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first `_` after a known section to a dot.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that
/// `STRONGBOX_SESSION_TIMEOUT_SECS` maps to `session.timeout_secs`, not
/// `session.timeout.secs`. `STRONGBOX_PASSCODE` (the passcode itself) is not
/// a config key and is ignored.
fn env_provider() -> Env {
    Env::prefixed("STRONGBOX_")
        .filter(|key| key.as_str() != "passcode")
        .map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("session_timeout_secs"), "session.timeout_secs");
        assert_eq!(map_env_key("pin_max_attempts"), "pin.max_attempts");
        assert_eq!(map_env_key("passcode_kdf_memory_cost"), "passcode.kdf_memory_cost");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn env_override_applies() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STRONGBOX_SESSION_TIMEOUT_SECS", "120");
            jail.set_env("STRONGBOX_PIN_MAX_ATTEMPTS", "3");
            let config: StrongboxConfig = Figment::new()
                .merge(Serialized::defaults(StrongboxConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.session.timeout_secs, 120);
            assert_eq!(config.pin.max_attempts, 3);
            Ok(())
        });
    }
}
