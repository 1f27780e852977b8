// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI command handlers.
//!
//! Each handler unlocks on demand. Unlock is a no-op inside a live shell
//! session, so the shell reuses these handlers unchanged.

use colored::Colorize;
use secrecy::ExposeSecret;
use strongbox_core::StrongboxError;
use strongbox_vault::prompt::{self, PASSCODE_ENV_VAR, PIN_ENV_VAR, SECRET_ENV_VAR};
use strongbox_vault::{Credential, CredentialSummary, CredentialUpdate, VaultStats, mask_secret};
use uuid::Uuid;

use crate::app::App;

/// Unlock through the device passcode or, with `use_pin`, the PIN path.
pub async fn unlock(app: &App, use_pin: bool) -> Result<(), StrongboxError> {
    if !use_pin {
        return app.engine.unlock().await;
    }
    if app.engine.is_unlocked().await {
        return Ok(());
    }
    let pin = prompt::read_pin("PIN: ")?.ok_or(StrongboxError::UserCanceled)?;
    app.engine.unlock_with_pin(&pin).await
}

pub async fn init(app: &App) -> Result<(), StrongboxError> {
    if app.engine.is_initialized().await? {
        return Err(StrongboxError::AlreadyInitialized);
    }
    if !app.passcode.is_enrolled().await? {
        println!("No device passcode is enrolled. Choose one to protect this vault.");
        let passcode = prompt::read_new_secret(PASSCODE_ENV_VAR, "device passcode")?;
        app.passcode.enroll(&passcode).await?;
    }
    app.engine.initialize_vault().await?;
    println!("{} vault created", "ok".green());
    Ok(())
}

pub async fn add(
    app: &App,
    domain: String,
    username: String,
    notes: Option<String>,
    use_pin: bool,
) -> Result<(), StrongboxError> {
    unlock(app, use_pin).await?;
    let password = prompt::read_new_secret(SECRET_ENV_VAR, "password")?;

    let mut credential = Credential::new(domain, username, password);
    credential.notes = notes;
    app.engine.save(&credential).await?;
    println!("{} saved {}", "ok".green(), credential.id);
    Ok(())
}

pub async fn get(app: &App, id: Uuid, reveal: bool, use_pin: bool) -> Result<(), StrongboxError> {
    unlock(app, use_pin).await?;
    let credential = app.engine.get(id).await?;

    let password = credential.password.expose_secret();
    println!("{:<10} {}", "id".bold(), credential.id);
    println!("{:<10} {}", "domain".bold(), credential.domain);
    println!("{:<10} {}", "username".bold(), credential.username);
    if reveal {
        println!("{:<10} {}", "password".bold(), password);
    } else {
        println!("{:<10} {}", "password".bold(), mask_secret(password));
    }
    if let Some(notes) = &credential.notes {
        println!("{:<10} {}", "notes".bold(), notes);
    }
    println!(
        "{:<10} {}",
        "modified".bold(),
        credential.modified_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

pub async fn list(app: &App, use_pin: bool) -> Result<(), StrongboxError> {
    unlock(app, use_pin).await?;
    let outcome = app.engine.list().await?;

    if outcome.credentials.is_empty() {
        println!("{}", "vault is empty".dimmed());
    }
    for summary in outcome.credentials.iter().map(CredentialSummary::from) {
        println!("{}  {}", summary.id.to_string().dimmed(), render_summary(&summary));
    }
    if outcome.skipped > 0 {
        eprintln!(
            "{}: {} credential(s) failed verification and were skipped",
            "warning".yellow(),
            outcome.skipped
        );
    }
    Ok(())
}

/// One listing row: domain, username, and last change. Never the secret.
pub fn render_summary(summary: &CredentialSummary) -> String {
    format!(
        "{:<30} {:<24} {}",
        summary.domain,
        summary.username,
        summary.modified_at.format("%Y-%m-%d")
    )
}

pub async fn update(
    app: &App,
    id: Uuid,
    username: Option<String>,
    change_password: bool,
    notes: Option<Option<String>>,
    use_pin: bool,
) -> Result<(), StrongboxError> {
    unlock(app, use_pin).await?;
    let password = if change_password {
        Some(prompt::read_new_secret(SECRET_ENV_VAR, "password")?)
    } else {
        None
    };
    let changes = CredentialUpdate {
        username,
        password,
        notes,
    };
    if changes.is_empty() {
        println!("{}", "nothing to change".dimmed());
        return Ok(());
    }

    app.engine.update(id, changes).await?;
    println!("{} updated {id}", "ok".green());
    Ok(())
}

pub async fn delete(app: &App, id: Uuid, use_pin: bool) -> Result<(), StrongboxError> {
    unlock(app, use_pin).await?;
    app.engine.delete(id).await?;
    println!("{} deleted {id}", "ok".green());
    Ok(())
}

pub async fn rotate(app: &App) -> Result<(), StrongboxError> {
    let report = app.engine.rotate_key().await?;
    println!(
        "{} rotated key v{} -> v{} ({} credential(s) re-encrypted)",
        "ok".green(),
        report.old_version,
        report.new_version,
        report.migrated
    );
    Ok(())
}

pub async fn stats(app: &App) -> Result<(), StrongboxError> {
    let stats = app.engine.get_stats().await?;
    print!("{}", render_stats(&stats));
    Ok(())
}

pub async fn reset(app: &App, confirmed: bool) -> Result<(), StrongboxError> {
    if !confirmed {
        return Err(StrongboxError::Config(
            "reset erases every credential; rerun with --yes to confirm".to_string(),
        ));
    }
    app.engine.reset_vault().await?;
    println!("{} vault erased", "ok".green());
    Ok(())
}

pub async fn pin_enable(app: &App) -> Result<(), StrongboxError> {
    let pin = prompt::read_new_secret(PIN_ENV_VAR, "PIN")?;
    app.engine.enable_pin(&pin).await?;
    println!("{} PIN unlock enabled", "ok".green());
    Ok(())
}

pub async fn pin_disable(app: &App) -> Result<(), StrongboxError> {
    app.engine.disable_pin().await?;
    println!("{} PIN unlock disabled", "ok".green());
    Ok(())
}

/// Plain-text statistics block.
pub fn render_stats(stats: &VaultStats) -> String {
    let fmt = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let mut out = String::new();
    out.push_str(&format!("key version:      v{}\n", stats.current_version));
    out.push_str(&format!("credentials:      {}\n", stats.total_credentials));
    out.push_str(&format!("created:          {}\n", fmt(stats.created_at)));
    out.push_str(&format!("last modified:    {}\n", fmt(stats.last_modified)));
    let rotated = stats.last_rotation.map(fmt).unwrap_or_else(|| "never".to_string());
    out.push_str(&format!("last rotation:    {rotated}\n"));
    let due = if stats.rotation_due { " (rotation due)" } else { "" };
    out.push_str(&format!(
        "rotation policy:  every {} days{due}\n",
        stats.rotation_interval_days
    ));
    let pin = if stats.pin_enabled { "enabled" } else { "disabled" };
    out.push_str(&format!("PIN unlock:       {pin}\n"));
    let session = match stats.session_expires_at {
        Some(at) if stats.unlocked => format!("unlocked until {}", fmt(at)),
        _ => "locked".to_string(),
    };
    out.push_str(&format!("session:          {session}\n"));
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample() -> VaultStats {
        let t = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        VaultStats {
            current_version: 3,
            total_credentials: 12,
            created_at: t,
            last_modified: t,
            last_rotation: None,
            rotation_interval_days: 90,
            rotation_due: true,
            pin_enabled: false,
            unlocked: false,
            session_expires_at: None,
        }
    }

    #[test]
    fn stats_render_locked_vault() {
        let text = render_stats(&sample());
        assert!(text.contains("key version:      v3"));
        assert!(text.contains("credentials:      12"));
        assert!(text.contains("last rotation:    never"));
        assert!(text.contains("every 90 days (rotation due)"));
        assert!(text.contains("session:          locked"));
    }

    #[test]
    fn listing_row_shows_identity_only() {
        let credential = Credential::new(
            "example.com",
            "alice",
            secrecy::SecretString::from("hunter22"),
        );
        let row = render_summary(&CredentialSummary::from(&credential));
        assert!(row.starts_with("example.com "));
        assert!(row.contains("alice"));
        assert!(row.contains(&credential.modified_at.format("%Y-%m-%d").to_string()));
        assert!(!row.contains("hunter22"));
    }

    #[test]
    fn stats_render_unlocked_session() {
        let mut stats = sample();
        stats.unlocked = true;
        stats.session_expires_at = Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 9, 5).unwrap());
        stats.pin_enabled = true;
        let text = render_stats(&stats);
        assert!(text.contains("unlocked until 2026-01-02 03:09:05 UTC"));
        assert!(text.contains("PIN unlock:       enabled"));
    }
}
