//! Session management CLI operations for hearth.
//!
//! Handles listing, resuming and deleting chat sessions through the
//! `hearth session` subcommand family, with table output and git-style
//! short IDs.

use anyhow::Result;
use colored::Colorize;

use super::{build_agent, SessionAction};
use crate::chat;
use crate::config::Config;
use crate::session::{short_id, SessionMeta, SessionStore};

/// Dispatches a session subcommand to its handler.
pub(crate) async fn handle_session(action: SessionAction) -> Result<()> {
    let store = SessionStore::open_default()?;
    match action {
        SessionAction::List => session_list(&store),
        SessionAction::Resume { id } => {
            let config = Config::load()?;
            let (agent, rag) = build_agent(&config)?;
            chat::run_chat(agent, rag, config.docs_dir(), Some(id)).await
        }
        SessionAction::Delete { id } => {
            let full_id = store.resolve_id(&id)?;
            session_delete(&store, &full_id)
        }
    }
}

/// Lists all saved sessions in a table sized to the terminal.
fn session_list(store: &SessionStore) -> Result<()> {
    let mut sessions = store.list()?;
    if sessions.is_empty() {
        println!("{}", "No sessions found.".dimmed());
        println!("Start one with: {}", "hearth chat".cyan());
        return Ok(());
    }
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);
    let title_width = title_width(&sessions, term_width);
    let header_width = 10 + title_width + 2 + 6 + 18 + 20;

    println!(
        "{} {} {} {} {}",
        format!("{:<10}", "ID").bold(),
        format!("{:<tw$}", "TITLE", tw = title_width + 2).bold(),
        format!("{:<6}", "MSGS").bold(),
        format!("{:<18}", "UPDATED").bold(),
        "MODEL".bold(),
    );
    println!("{}", "-".repeat(term_width.min(header_width)));

    for s in &sessions {
        // Pad first, then colorize so ANSI codes don't skew widths
        let id_col = format!("{:<10}", short_id(&s.id));
        let title_col = format!(
            "{:<tw$}",
            fit(s.title.as_deref().unwrap_or("(untitled)"), title_width),
            tw = title_width + 2
        );
        let msgs_col = format!("{:<6}", s.message_count);
        let updated_col = format!("{:<18}", format_updated(&s.updated_at));

        println!(
            "{} {} {} {} {}",
            id_col.cyan(),
            title_col,
            msgs_col.yellow(),
            updated_col.dimmed(),
            s.model.dimmed(),
        );
    }
    println!();
    println!(
        "{} {} sessions. Resume with: {}",
        "total:".dimmed(),
        sessions.len(),
        "hearth session resume <id>".cyan()
    );
    Ok(())
}

/// Title column width: the longest title, capped by the terminal and at 50.
fn title_width(sessions: &[SessionMeta], term_width: usize) -> usize {
    let fixed_cols = 10 + 6 + 18 + 20;
    let longest = sessions
        .iter()
        .map(|s| s.title.as_deref().unwrap_or("(untitled)").chars().count())
        .max()
        .unwrap_or(5);
    let max_from_terminal = term_width.saturating_sub(fixed_cols).min(50);
    longest.max(5).min(max_from_terminal.max(5))
}

fn fit(title: &str, width: usize) -> String {
    if title.chars().count() > width {
        let truncated: String = title.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

/// RFC 3339 timestamp as `YYYY-MM-DD HH:MM`.
fn format_updated(updated_at: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(updated_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| updated_at.chars().take(16).collect())
}

fn session_delete(store: &SessionStore, id: &str) -> Result<()> {
    let sessions = store.list()?;
    let meta = sessions
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| anyhow::anyhow!("Session not found: {}", id))?;
    let title = meta.title.as_deref().unwrap_or("(untitled)");
    println!("Deleting session {} (\"{}\")", short_id(id).cyan(), title);
    store.delete(id)?;
    println!("{}", "Deleted.".green());
    Ok(())
}
