//! Interactive chat REPL for hearth.
//!
//! A multi-turn conversation loop using [`rustyline`] for line editing and
//! history. The agent keeps the whole conversation, so each question sees
//! prior answers and tool results. Every turn is appended to a session file
//! so the chat can be resumed later.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::agent::Agent;
use crate::config::Config;
use crate::message::Role;
use crate::output::{format_message, Renderer, StdoutRenderer};
use crate::rag::Rag;
use crate::session::{Session, SessionStore};

/// Runs the interactive chat REPL.
///
/// # Readline behavior
///
/// - **Ctrl+C**: cancels current input, stays in REPL
/// - **Ctrl+D**: exits with "Bye!"
/// - Readline history is persisted to `~/.cache/hearth/chat_history.txt`
pub async fn run_chat(
    mut agent: Agent,
    rag: Arc<Rag>,
    docs_dir: PathBuf,
    session_id: Option<String>,
) -> Result<()> {
    let store = SessionStore::open_default()?;
    let mut session = open_session(&store, &mut agent, session_id.as_deref())?;

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::history_path()?;
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    let mut renderer = StdoutRenderer::new();

    loop {
        let readline = rl.readline(&format!("{} ", "You:".green().bold()));

        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if line.starts_with('/') {
                    match commands::handle_slash_command(&line, &mut agent, &rag, &docs_dir)
                        .await?
                    {
                        commands::CommandAction::Continue => continue,
                        commands::CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {} (try /help)", "?".yellow(), cmd);
                            continue;
                        }
                    }
                }

                let before = agent.history().len();
                match agent.ask(&line, &mut renderer).await {
                    Ok(answer) => {
                        println!();
                        println!("{} {}", "Agent:".cyan().bold(), answer);
                        println!();
                        session.append(&agent.history()[before..])?;
                    }
                    Err(e) => renderer.render_error(&format!("{e:#}")),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Bye!".dimmed());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Creates a fresh session or resumes `id`, replaying its messages into the agent.
fn open_session(store: &SessionStore, agent: &mut Agent, id: Option<&str>) -> Result<Session> {
    let Some(id) = id else {
        let session = store.create(agent.model())?;
        println!(
            "{} [session: {}] [model: {}] (Ctrl+D to exit, /help for commands)",
            "hearth chat".bold().cyan(),
            session.short_id().yellow(),
            agent.model().yellow(),
        );
        println!();
        return Ok(session);
    };

    let full_id = store.resolve_id(id)?;
    let session = store.load(&full_id)?;
    println!(
        "{} [session: {}] [model: {}]",
        "resuming".bold().cyan(),
        session.short_id().yellow(),
        agent.model().yellow(),
    );
    println!();
    for msg in session.messages.iter().filter(|m| m.role != Role::System) {
        println!("{}", format_message(msg));
    }
    println!();

    agent.restore(session.messages.iter().cloned());
    Ok(session)
}
