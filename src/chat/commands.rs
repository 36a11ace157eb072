//! Slash command handlers for the chat REPL.
//!
//! Dispatches `/help`, `/history`, `/clear`, `/reflect` and `/ingest`.
//! Returns a [`CommandAction`] so the REPL loop can decide how to proceed.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::agent::Agent;
use crate::message::Role;
use crate::output::format_message;
use crate::rag::Rag;

/// Action returned by slash command handling.
#[derive(Debug, PartialEq)]
pub(crate) enum CommandAction {
    /// Command was handled; continue the REPL loop.
    Continue,
    /// Unknown command was entered.
    Unknown(String),
}

/// Dispatch and handle a slash command.
///
/// Failures inside a command (an unreachable embedding model during
/// `/ingest`, say) are reported and the REPL keeps going.
pub(crate) async fn handle_slash_command(
    line: &str,
    agent: &mut Agent,
    rag: &Rag,
    docs_dir: &Path,
) -> Result<CommandAction> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match command {
        "/history" => {
            for msg in agent.history() {
                if msg.role == Role::System {
                    continue;
                }
                println!("{}", format_message(msg));
            }
            Ok(CommandAction::Continue)
        }
        "/clear" => {
            agent.clear();
            println!("{}", "History cleared.".dimmed());
            Ok(CommandAction::Continue)
        }
        "/reflect" => {
            match arg {
                Some("on") => agent.set_reflection(true),
                Some("off") => agent.set_reflection(false),
                Some(other) => {
                    println!("{} expected 'on' or 'off', got '{}'", "?".yellow(), other);
                    return Ok(CommandAction::Continue);
                }
                None => {}
            }
            let state = if agent.reflection() { "on" } else { "off" };
            println!("{} {}", "reflection:".dimmed(), state.cyan());
            Ok(CommandAction::Continue)
        }
        "/ingest" => {
            let folder = arg.map(Path::new).unwrap_or(docs_dir);
            println!("{} {}", "ingesting".dimmed(), folder.display());
            match rag.ingest(folder).await {
                Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                Err(e) => eprintln!("{} ingest failed: {:#}", "error:".red().bold(), e),
            }
            Ok(CommandAction::Continue)
        }
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - clear conversation", "/clear".cyan());
            println!("  {} - toggle answer review", "/reflect on|off".cyan());
            println!("  {} - ingest documents into the vector store", "/ingest [folder]".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - exit", "Ctrl+D".cyan());
            Ok(CommandAction::Continue)
        }
        _ => Ok(CommandAction::Unknown(command.to_string())),
    }
}
