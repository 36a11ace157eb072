//! Environment variable substitution and typed accessors with fallbacks.

use std::path::PathBuf;

use super::types::Config;

use crate::constants::{
    DEFAULT_CHUNK_WORDS, DEFAULT_COLLECTION, DEFAULT_DOCS_DIR, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_MAX_ITERATIONS, DEFAULT_NUM_CTX, DEFAULT_SEARCH_ENDPOINT, DEFAULT_SEARCH_RESULTS,
    DEFAULT_SEARCH_TIMEOUT_SECS, DEFAULT_STORE_DIR, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
    OLLAMA_DEFAULT_BASE_URL, OLLAMA_URL_ENV_VARS,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in [&mut self.model, &mut self.base_model, &mut self.system_prompt] {
            *field = Self::resolve_str(field);
        }
        for field in [
            &mut self.ollama.base_url,
            &mut self.rag.docs_dir,
            &mut self.rag.store_dir,
            &mut self.rag.collection,
            &mut self.rag.embedding_model,
            &mut self.search.endpoint,
        ] {
            if let Some(value) = field {
                *value = Self::resolve_str(value);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    /// Substituted values are not scanned again.
    fn resolve_str(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(start) = rest.find("{env:") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            result.push_str(&rest[..start]);
            let var_name = &rest[start + 5..start + len];
            result.push_str(&std::env::var(var_name).unwrap_or_default());
            rest = &rest[start + len + 1..];
        }
        result.push_str(rest);
        result
    }

    /// Ollama server URL: environment override, then config, then localhost.
    pub fn ollama_base_url(&self) -> String {
        let from_env = OLLAMA_URL_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty());
        self.base_url_with_override(from_env)
    }

    fn base_url_with_override(&self, from_env: Option<String>) -> String {
        let raw = from_env
            .or_else(|| self.ollama.base_url.clone())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| OLLAMA_DEFAULT_BASE_URL.to_string());
        with_scheme(raw.trim())
    }

    pub fn ollama_num_ctx(&self) -> u32 {
        self.ollama.num_ctx.unwrap_or(DEFAULT_NUM_CTX)
    }

    pub fn ollama_temperature(&self) -> f32 {
        self.ollama.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Model round-trips per question; never less than one.
    pub fn max_iterations(&self) -> usize {
        self.agent
            .max_iterations
            .unwrap_or(DEFAULT_MAX_ITERATIONS)
            .max(1)
    }

    pub fn reflection(&self) -> bool {
        self.agent.reflection.unwrap_or(false)
    }

    pub fn docs_dir(&self) -> PathBuf {
        PathBuf::from(self.rag.docs_dir.as_deref().unwrap_or(DEFAULT_DOCS_DIR))
    }

    pub fn store_dir(&self) -> PathBuf {
        PathBuf::from(self.rag.store_dir.as_deref().unwrap_or(DEFAULT_STORE_DIR))
    }

    pub fn collection(&self) -> &str {
        self.rag.collection.as_deref().unwrap_or(DEFAULT_COLLECTION)
    }

    pub fn embedding_model(&self) -> &str {
        self.rag
            .embedding_model
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    /// Chunk word budget; never less than one.
    pub fn chunk_words(&self) -> usize {
        self.rag.chunk_words.unwrap_or(DEFAULT_CHUNK_WORDS).max(1)
    }

    pub fn top_k(&self) -> usize {
        self.rag.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn search_endpoint(&self) -> &str {
        self.search
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_SEARCH_ENDPOINT)
    }

    pub fn search_max_results(&self) -> usize {
        self.search.max_results.unwrap_or(DEFAULT_SEARCH_RESULTS)
    }

    pub fn search_timeout_secs(&self) -> u64 {
        self.search
            .timeout_secs
            .unwrap_or(DEFAULT_SEARCH_TIMEOUT_SECS)
    }
}

/// `OLLAMA_HOST` is commonly set as a bare `host:port`.
fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_str_substitutes_env() {
        std::env::set_var("HEARTH_TEST_RESOLVE_VAR", "value");
        assert_eq!(
            Config::resolve_str("a-{env:HEARTH_TEST_RESOLVE_VAR}-b"),
            "a-value-b"
        );
        assert_eq!(Config::resolve_str("{env:HEARTH_TEST_UNSET_VAR}"), "");
        assert_eq!(Config::resolve_str("{env:unterminated"), "{env:unterminated");
    }

    #[test]
    fn test_resolve_str_does_not_rescan_values() {
        std::env::set_var("HEARTH_TEST_SELF_REF", "{env:HEARTH_TEST_SELF_REF}");
        assert_eq!(
            Config::resolve_str("x{env:HEARTH_TEST_SELF_REF}y{env:HEARTH_TEST_SELF_REF}"),
            "x{env:HEARTH_TEST_SELF_REF}y{env:HEARTH_TEST_SELF_REF}"
        );
    }

    #[test]
    fn test_base_url_precedence() {
        let mut config = Config::default();
        assert_eq!(config.base_url_with_override(None), OLLAMA_DEFAULT_BASE_URL);

        config.ollama.base_url = Some("http://gpu-box:11434".to_string());
        assert_eq!(config.base_url_with_override(None), "http://gpu-box:11434");

        assert_eq!(
            config.base_url_with_override(Some("0.0.0.0:11434".to_string())),
            "http://0.0.0.0:11434"
        );
    }

    #[test]
    fn test_accessor_defaults() {
        let config = Config::default();
        assert_eq!(config.ollama_temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.docs_dir(), PathBuf::from(DEFAULT_DOCS_DIR));
        assert_eq!(config.store_dir(), PathBuf::from(DEFAULT_STORE_DIR));
        assert_eq!(config.embedding_model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.chunk_words(), DEFAULT_CHUNK_WORDS);
        assert_eq!(config.top_k(), DEFAULT_TOP_K);
        assert_eq!(config.search_endpoint(), DEFAULT_SEARCH_ENDPOINT);
        assert_eq!(config.search_max_results(), DEFAULT_SEARCH_RESULTS);
    }

    #[test]
    fn test_iteration_and_chunk_floors() {
        let mut config = Config::default();
        config.agent.max_iterations = Some(0);
        config.rag.chunk_words = Some(0);
        assert_eq!(config.max_iterations(), 1);
        assert_eq!(config.chunk_words(), 1);
    }
}
