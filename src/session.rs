//! Session persistence for hearth chats.
//!
//! Each session is a JSONL file of messages under
//! `~/.local/share/hearth/sessions/`, with an `index.json` beside it holding
//! metadata for every session. JSONL is append-only, so a crash mid-turn
//! loses at most the message being written.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::SESSION_TITLE_CHARS;
use crate::message::{Message, Role};

/// Metadata for a single session, stored in the session index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub title: Option<String>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
}

/// Index of all sessions, persisted as `index.json`.
#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionIndex {
    sessions: Vec<SessionMeta>,
}

/// The directory holding session files and their index.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store under the XDG data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Config::sessions_dir()?))
    }

    /// Starts a new, empty session with a UUID v4 identifier.
    pub fn create(&self, model: &str) -> Result<Session> {
        fs::create_dir_all(&self.dir).context("Failed to create sessions directory")?;
        let id = Uuid::new_v4().to_string();
        Ok(Session {
            file_path: self.session_path(&id),
            id,
            messages: Vec::new(),
            model: model.to_string(),
            store: self.clone(),
        })
    }

    /// Loads a session's messages and model.
    pub fn load(&self, id: &str) -> Result<Session> {
        let file_path = self.session_path(id);
        anyhow::ensure!(file_path.exists(), "Session {} not found", short_id(id));

        let model = self
            .load_index()?
            .sessions
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.model)
            .unwrap_or_default();

        let file = fs::File::open(&file_path)
            .with_context(|| format!("Failed to open session file {:?}", file_path))?;
        let mut messages = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let msg: Message = serde_json::from_str(&line)
                .with_context(|| "Failed to parse message from session file")?;
            messages.push(msg);
        }

        Ok(Session {
            id: id.to_string(),
            messages,
            model,
            file_path,
            store: self.clone(),
        })
    }

    /// Returns metadata for all sessions.
    pub fn list(&self) -> Result<Vec<SessionMeta>> {
        Ok(self.load_index()?.sessions)
    }

    /// Deletes a session's JSONL file and removes it from the index.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.session_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete session file {:?}", path))?;
        }

        let mut index = self.load_index()?;
        index.sessions.retain(|s| s.id != id);
        if self.dir.exists() {
            self.save_index(&index)?;
        }
        Ok(())
    }

    /// Resolves a git-style short id to the one session it prefixes.
    pub fn resolve_id(&self, partial: &str) -> Result<String> {
        let matches: Vec<SessionMeta> = self
            .list()?
            .into_iter()
            .filter(|s| s.id.starts_with(partial))
            .collect();
        match matches.as_slice() {
            [] => anyhow::bail!("No session found matching '{}'", partial),
            [only] => Ok(only.id.clone()),
            many => {
                let candidates: Vec<String> = many
                    .iter()
                    .map(|s| {
                        format!(
                            "{} {}",
                            short_id(&s.id),
                            s.title.as_deref().unwrap_or("(untitled)")
                        )
                    })
                    .collect();
                anyhow::bail!(
                    "Multiple sessions match '{}', provide more characters:\n  {}",
                    partial,
                    candidates.join("\n  ")
                )
            }
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", id))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn load_index(&self) -> Result<SessionIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(SessionIndex::default());
        }
        let contents = fs::read_to_string(&path).with_context(|| "Failed to read session index")?;
        let index: SessionIndex =
            serde_json::from_str(&contents).with_context(|| "Failed to parse session index")?;
        Ok(index)
    }

    fn save_index(&self, index: &SessionIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), json).with_context(|| "Failed to write session index")
    }
}

/// An active conversation session.
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub model: String,
    file_path: PathBuf,
    store: SessionStore,
}

impl Session {
    /// Appends messages to the JSONL file and refreshes the index entry.
    pub fn append(&mut self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .with_context(|| format!("Failed to open session file {:?}", self.file_path))?;
        for msg in messages {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }
        file.flush()?;

        self.messages.extend_from_slice(messages);
        self.update_index()
    }

    /// The first user message, cut to 50 characters.
    pub fn title(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| {
                let text = m.text();
                if text.chars().count() > SESSION_TITLE_CHARS {
                    let truncated: String = text.chars().take(SESSION_TITLE_CHARS).collect();
                    format!("{}...", truncated)
                } else {
                    text.to_string()
                }
            })
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    fn update_index(&self) -> Result<()> {
        let mut index = self.store.load_index()?;
        let now = Utc::now().to_rfc3339();

        if let Some(entry) = index.sessions.iter_mut().find(|s| s.id == self.id) {
            entry.title = self.title();
            entry.updated_at = now;
            entry.message_count = self.messages.len();
        } else {
            index.sessions.push(SessionMeta {
                id: self.id.clone(),
                title: self.title(),
                model: self.model.clone(),
                created_at: now.clone(),
                updated_at: now,
                message_count: self.messages.len(),
            });
        }
        self.store.save_index(&index)
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
