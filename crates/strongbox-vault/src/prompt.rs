// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passcode and PIN acquisition via TTY prompt or environment variable.

use secrecy::SecretString;
use strongbox_core::StrongboxError;

/// Environment variable that supplies the device passcode non-interactively.
pub const PASSCODE_ENV_VAR: &str = "STRONGBOX_PASSCODE";

/// Environment variable that supplies the unlock PIN non-interactively.
pub const PIN_ENV_VAR: &str = "STRONGBOX_PIN";

/// Environment variable that supplies a credential password non-interactively.
pub const SECRET_ENV_VAR: &str = "STRONGBOX_SECRET";

/// Source of secrets typed by the user.
///
/// `Ok(None)` means the user dismissed the prompt.
pub trait PasscodePrompt: Send + Sync {
    fn read_passcode(&self, reason: &str) -> Result<Option<SecretString>, StrongboxError>;
}

/// Reads from `STRONGBOX_PASSCODE`, falling back to a hidden TTY prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtyPrompt;

impl PasscodePrompt for TtyPrompt {
    fn read_passcode(&self, reason: &str) -> Result<Option<SecretString>, StrongboxError> {
        read_secret(PASSCODE_ENV_VAR, &format!("{reason}. Device passcode: "))
    }
}

/// Read the unlock PIN from `STRONGBOX_PIN` or the TTY.
pub fn read_pin(label: &str) -> Result<Option<SecretString>, StrongboxError> {
    read_secret(PIN_ENV_VAR, label)
}

/// Read a new secret twice and require both entries to match.
pub fn read_new_secret(env_var: &str, label: &str) -> Result<SecretString, StrongboxError> {
    if let Some(value) = env_value(env_var) {
        return Ok(value);
    }
    require_tty(env_var)?;

    let first = read_hidden(&format!("New {label}: "))?;
    let second = read_hidden(&format!("Confirm {label}: "))?;
    if first != second {
        return Err(StrongboxError::Config(format!("{label}s do not match")));
    }
    if first.is_empty() {
        return Err(StrongboxError::Config(format!("empty {label} not allowed")));
    }
    Ok(SecretString::from(first))
}

fn read_secret(env_var: &str, label: &str) -> Result<Option<SecretString>, StrongboxError> {
    if let Some(value) = env_value(env_var) {
        return Ok(Some(value));
    }
    require_tty(env_var)?;

    let value = read_hidden(label)?;
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(SecretString::from(value)))
}

fn env_value(env_var: &str) -> Option<SecretString> {
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

fn require_tty(env_var: &str) -> Result<(), StrongboxError> {
    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        Ok(())
    } else {
        Err(StrongboxError::Config(format!(
            "no terminal available; set {env_var} or run interactively"
        )))
    }
}

fn read_hidden(label: &str) -> Result<String, StrongboxError> {
    eprint!("{label}");
    rpassword::read_password().map_err(|e| StrongboxError::Internal(format!("failed to read input: {e}")))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn passcode_from_env_var() {
        // SAFETY: env mutation is serialized across tests.
        unsafe { std::env::set_var(PASSCODE_ENV_VAR, "123456") };
        let result = TtyPrompt.read_passcode("Unlock vault");
        unsafe { std::env::remove_var(PASSCODE_ENV_VAR) };

        assert_eq!(result.unwrap().unwrap().expose_secret(), "123456");
    }

    #[test]
    #[serial]
    fn new_secret_from_env_skips_confirmation() {
        unsafe { std::env::set_var(PIN_ENV_VAR, "4821") };
        let result = read_new_secret(PIN_ENV_VAR, "PIN");
        unsafe { std::env::remove_var(PIN_ENV_VAR) };

        assert_eq!(result.unwrap().expose_secret(), "4821");
    }

    #[test]
    #[serial]
    fn empty_env_var_without_tty_is_error() {
        if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            return;
        }
        unsafe { std::env::set_var(PIN_ENV_VAR, "") };
        let result = read_pin("PIN: ");
        unsafe { std::env::remove_var(PIN_ENV_VAR) };

        assert!(result.is_err());
    }
}
