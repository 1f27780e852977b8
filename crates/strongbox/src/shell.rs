// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox shell` command implementation.
//!
//! An interactive REPL with readline history. The vault stays unlocked
//! between commands until the session expires or `lock` is entered.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use strongbox_core::StrongboxError;
use uuid::Uuid;

use crate::app::App;
use crate::commands;

/// One parsed REPL line.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Help,
    Quit,
    Unlock,
    UnlockPin,
    Lock,
    Status,
    List,
    Get { id: Uuid, reveal: bool },
    Add { domain: String, username: String },
    Delete(Uuid),
    Rotate,
}

const HELP: &str = "\
commands:
  unlock                 unlock with the device passcode
  unlock-pin             unlock with the PIN
  lock                   lock the vault now
  status                 show vault statistics
  list                   list credentials
  get <id>               show a credential (password masked)
  show <id>              show a credential with its password
  add <domain> <user>    store a new credential
  delete <id>            delete a credential
  rotate                 rotate the vault key
  quit                   leave the shell";

fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let id_arg = |args: &[&str]| -> Result<Uuid, String> {
        match args {
            [id] => id.parse().map_err(|_| format!("not a credential id: {id}")),
            _ => Err(format!("usage: {head} <id>")),
        }
    };

    match (head, args.as_slice()) {
        ("help" | "?", []) => Ok(ShellCommand::Help),
        ("quit" | "exit" | "/quit" | "/exit", []) => Ok(ShellCommand::Quit),
        ("unlock", []) => Ok(ShellCommand::Unlock),
        ("unlock-pin", []) => Ok(ShellCommand::UnlockPin),
        ("lock", []) => Ok(ShellCommand::Lock),
        ("status" | "stats", []) => Ok(ShellCommand::Status),
        ("list" | "ls", []) => Ok(ShellCommand::List),
        ("get", rest) => Ok(ShellCommand::Get {
            id: id_arg(rest)?,
            reveal: false,
        }),
        ("show", rest) => Ok(ShellCommand::Get {
            id: id_arg(rest)?,
            reveal: true,
        }),
        ("add", [domain, username]) => Ok(ShellCommand::Add {
            domain: (*domain).to_string(),
            username: (*username).to_string(),
        }),
        ("add", _) => Err("usage: add <domain> <username>".to_string()),
        ("delete" | "rm", rest) => Ok(ShellCommand::Delete(id_arg(rest)?)),
        ("rotate", []) => Ok(ShellCommand::Rotate),
        _ => Err(format!("unknown command: {line} (try `help`)")),
    }
}

/// Runs the `strongbox shell` interactive REPL.
pub async fn run_shell(app: &App) -> Result<(), StrongboxError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| StrongboxError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "strongbox shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    loop {
        let prompt = if app.engine.is_unlocked().await {
            format!("{}> ", "strongbox".green())
        } else {
            format!("{}> ", "strongbox[locked]".red())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match parse_line(trimmed) {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("{}", message.yellow());
                        continue;
                    }
                };
                if command == ShellCommand::Quit {
                    break;
                }
                if let Err(e) = dispatch(app, command).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    app.engine.lock().await;
    println!("{}", "vault locked, goodbye".dimmed());
    Ok(())
}

async fn dispatch(app: &App, command: ShellCommand) -> Result<(), StrongboxError> {
    match command {
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
        ShellCommand::Unlock => commands::unlock(app, false).await,
        ShellCommand::UnlockPin => commands::unlock(app, true).await,
        ShellCommand::Lock => {
            app.engine.lock().await;
            Ok(())
        }
        ShellCommand::Status => commands::stats(app).await,
        ShellCommand::List => commands::list(app, false).await,
        ShellCommand::Get { id, reveal } => commands::get(app, id, reveal, false).await,
        ShellCommand::Add { domain, username } => {
            commands::add(app, domain, username, None, false).await
        }
        ShellCommand::Delete(id) => commands::delete(app, id, false).await,
        ShellCommand::Rotate => commands::rotate(app).await,
    }
}
