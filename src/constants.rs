//! Centralized constants for hearth.
//!
//! Default strings, limits, and configuration fallbacks live here so they can
//! be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "hearth";

/// Model the agent talks to (the Modelfile derivative of [`DEFAULT_BASE_MODEL`]).
pub const DEFAULT_MODEL: &str = "llama3.1:8b-expert";

/// Upstream model the Modelfile is built `FROM`.
pub const DEFAULT_BASE_MODEL: &str = "llama3.1:8b";

/// System prompt installed at the top of every agent conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert assistant. Plan privately, use tools when helpful, \
and NEVER reveal chain-of-thought. Be concise and correct. \
When using the retrieve tool, quote short snippets and include [source] after facts.";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "hearth.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Environment variable that sets the log filter.
pub const LOG_ENV_VAR: &str = "HEARTH_LOG";

// --- Ollama ---

/// Default base URL for the local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Environment variables consulted (in order) to override the server URL.
pub const OLLAMA_URL_ENV_VARS: &[&str] = &["HEARTH_OLLAMA_URL", "OLLAMA_HOST"];

/// Context window requested from the model.
pub const DEFAULT_NUM_CTX: u32 = 8192;

/// Sampling temperature requested from the model.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// --- Agent ---

/// Maximum model round-trips per question before tools are withdrawn.
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

/// System prompt for the reflection reviewer.
pub const REVIEWER_SYSTEM_PROMPT: &str = "You are a meticulous editor.";

/// Instructions prepended to the draft sent to the reviewer.
pub const REVIEWER_INSTRUCTIONS: &str = "Review the DRAFT for clarity/correctness.\n\
Return JSON only:\n\
{\"verdict\":\"ok\"}  OR  {\"verdict\":\"revise\",\"answer\":\"<improved final answer>\"}\n\
DRAFT:\n";

// --- RAG ---

/// Folder scanned by `hearth ingest` when none is given.
pub const DEFAULT_DOCS_DIR: &str = "docs";

/// Directory holding the persisted vector collections.
pub const DEFAULT_STORE_DIR: &str = "vectorstore";

/// Collection documents are ingested into.
pub const DEFAULT_COLLECTION: &str = "docs";

/// Ollama embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Word budget per chunk.
pub const DEFAULT_CHUNK_WORDS: usize = 350;

/// Number of chunks returned by retrieval when the caller gives no `k`.
pub const DEFAULT_TOP_K: usize = 5;

/// File extensions picked up during ingestion (compared lowercase).
pub const INGEST_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

// --- Web search ---

/// DuckDuckGo HTML endpoint (no API key required).
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Results returned by web search when the caller gives no `max_results`.
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Request timeout for web search.
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;

/// User agent sent with web search requests.
pub const SEARCH_USER_AGENT: &str = "hearth/0.1";

// --- Display ---

/// Tool output longer than this is shortened when echoed to the terminal.
pub const TOOL_PREVIEW_CHARS: usize = 200;

/// Session titles are cut to this many characters.
pub const SESSION_TITLE_CHARS: usize = 50;
