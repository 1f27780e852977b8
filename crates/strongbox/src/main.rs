// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongbox - a local, hardware-bound secrets vault.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use strongbox_config::StrongboxConfig;
use uuid::Uuid;

/// Strongbox - a local, hardware-bound secrets vault.
#[derive(Parser, Debug)]
#[command(name = "strongbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Enroll a device passcode (if needed) and create a new vault.
    Init,
    /// Store a new credential. The password is read from STRONGBOX_SECRET or the terminal.
    Add {
        domain: String,
        username: String,
        #[arg(long)]
        notes: Option<String>,
        /// Unlock with the PIN instead of the device passcode.
        #[arg(long)]
        pin: bool,
    },
    /// Show one credential.
    Get {
        id: Uuid,
        /// Print the password instead of a masked form.
        #[arg(long)]
        reveal: bool,
        #[arg(long)]
        pin: bool,
    },
    /// List every readable credential.
    List {
        #[arg(long)]
        pin: bool,
    },
    /// Change the username, password, or notes of a credential.
    Update {
        id: Uuid,
        #[arg(long)]
        username: Option<String>,
        /// Prompt for a new password.
        #[arg(long)]
        password: bool,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        #[arg(long)]
        pin: bool,
    },
    /// Delete a credential.
    Delete {
        id: Uuid,
        #[arg(long)]
        pin: bool,
    },
    /// Rotate the vault key and re-encrypt every credential.
    Rotate,
    /// Show vault statistics.
    Stats,
    /// Erase the vault, all credentials, and all key material.
    Reset {
        /// Confirm the erase.
        #[arg(long)]
        yes: bool,
    },
    /// Manage the alternate PIN unlock path.
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },
    /// Launch an interactive session that stays unlocked between commands.
    Shell,
}

#[derive(Subcommand, Debug)]
enum PinAction {
    /// Set or replace the unlock PIN.
    Enable,
    /// Remove the unlock PIN.
    Disable,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            strongbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("strongbox: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, &config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<StrongboxConfig, Vec<strongbox_config::ConfigError>> {
    match path {
        Some(path) => strongbox_config::load_and_validate_path(path),
        None => strongbox_config::load_and_validate(),
    }
}

async fn run(command: Commands, config: &StrongboxConfig) -> Result<(), strongbox_core::StrongboxError> {
    let app = app::App::open(config).await?;

    match command {
        Commands::Init => commands::init(&app).await,
        Commands::Add {
            domain,
            username,
            notes,
            pin,
        } => commands::add(&app, domain, username, notes, pin).await,
        Commands::Get { id, reveal, pin } => commands::get(&app, id, reveal, pin).await,
        Commands::List { pin } => commands::list(&app, pin).await,
        Commands::Update {
            id,
            username,
            password,
            notes,
            clear_notes,
            pin,
        } => {
            let notes = if clear_notes { Some(None) } else { notes.map(Some) };
            commands::update(&app, id, username, password, notes, pin).await
        }
        Commands::Delete { id, pin } => commands::delete(&app, id, pin).await,
        Commands::Rotate => commands::rotate(&app).await,
        Commands::Stats => commands::stats(&app).await,
        Commands::Reset { yes } => commands::reset(&app, yes).await,
        Commands::Pin {
            action: PinAction::Enable,
        } => commands::pin_enable(&app).await,
        Commands::Pin {
            action: PinAction::Disable,
        } => commands::pin_disable(&app).await,
        Commands::Shell => shell::run_shell(&app).await,
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "strongbox={log_level},strongbox_vault={log_level},strongbox_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_get_with_reveal() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["strongbox", "get", &id.to_string(), "--reveal"]).unwrap();
        match cli.command {
            Some(Commands::Get {
                id: parsed,
                reveal: true,
                pin: false,
            }) => assert_eq!(parsed, id),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_id() {
        assert!(Cli::try_parse_from(["strongbox", "delete", "not-a-uuid"]).is_err());
    }

    #[test]
    fn notes_and_clear_notes_conflict() {
        let id = Uuid::new_v4().to_string();
        assert!(
            Cli::try_parse_from(["strongbox", "update", &id, "--notes", "x", "--clear-notes"])
                .is_err()
        );
    }

    #[test]
    fn global_config_flag() {
        let cli = Cli::try_parse_from(["strongbox", "stats", "--config", "/tmp/s.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = load_config(None).expect("default config should be valid");
        assert_eq!(config.session.timeout_secs, 300);
    }
}
