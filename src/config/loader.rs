//! File loading and merging for hearth configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{
    default_base_model, default_model, default_system_prompt, AgentConfig, Config, OllamaConfig,
    RagConfig, SearchConfig,
};
use crate::constants::{
    DEFAULT_COLLECTION, DEFAULT_DOCS_DIR, DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_ITERATIONS,
    DEFAULT_NUM_CTX, DEFAULT_STORE_DIR, DEFAULT_TEMPERATURE, OLLAMA_DEFAULT_BASE_URL,
    PROJECT_CONFIG_FILENAME,
};

impl Config {
    /// Loads the global config from `~/.config/hearth/config.toml`.
    ///
    /// If no config file exists, writes one with the defaults spelled out
    /// and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }
        Self::from_file(&path)
    }

    /// Parses one TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for hearth.toml in the current dir, then walk up to the git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        Self::load_project_from(&std::env::current_dir()?)
    }

    pub(super) fn load_project_from(start: &Path) -> Result<Option<Config>> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::from_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: pick(project.model, global.model, default_model()),
            base_model: pick(project.base_model, global.base_model, default_base_model()),
            system_prompt: pick(
                project.system_prompt,
                global.system_prompt,
                default_system_prompt(),
            ),
            ollama: OllamaConfig {
                base_url: project.ollama.base_url.or(global.ollama.base_url),
                num_ctx: project.ollama.num_ctx.or(global.ollama.num_ctx),
                temperature: project.ollama.temperature.or(global.ollama.temperature),
            },
            agent: AgentConfig {
                max_iterations: project.agent.max_iterations.or(global.agent.max_iterations),
                reflection: project.agent.reflection.or(global.agent.reflection),
            },
            rag: RagConfig {
                docs_dir: project.rag.docs_dir.or(global.rag.docs_dir),
                store_dir: project.rag.store_dir.or(global.rag.store_dir),
                collection: project.rag.collection.or(global.rag.collection),
                embedding_model: project.rag.embedding_model.or(global.rag.embedding_model),
                chunk_words: project.rag.chunk_words.or(global.rag.chunk_words),
                top_k: project.rag.top_k.or(global.rag.top_k),
            },
            search: SearchConfig {
                max_results: project.search.max_results.or(global.search.max_results),
                endpoint: project.search.endpoint.or(global.search.endpoint),
                timeout_secs: project.search.timeout_secs.or(global.search.timeout_secs),
            },
        }
    }
}

/// A top-level string counts as set by the project when it differs from the default.
fn pick(project: String, global: String, default: String) -> String {
    if project != default {
        project
    } else {
        global
    }
}

fn default_toml() -> String {
    format!(
        r#"model = "{model}"
base_model = "{base_model}"

[ollama]
base_url = "{base_url}"
num_ctx = {num_ctx}
temperature = {temperature}

[agent]
max_iterations = {max_iterations}
reflection = false

[rag]
docs_dir = "{docs_dir}"
store_dir = "{store_dir}"
collection = "{collection}"
embedding_model = "{embedding_model}"
"#,
        model = default_model(),
        base_model = default_base_model(),
        base_url = OLLAMA_DEFAULT_BASE_URL,
        num_ctx = DEFAULT_NUM_CTX,
        temperature = DEFAULT_TEMPERATURE,
        max_iterations = DEFAULT_MAX_ITERATIONS,
        docs_dir = DEFAULT_DOCS_DIR,
        store_dir = DEFAULT_STORE_DIR,
        collection = DEFAULT_COLLECTION,
        embedding_model = DEFAULT_EMBEDDING_MODEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let config: Config = toml::from_str(&default_toml()).unwrap();
        assert_eq!(config.model, default_model());
        assert_eq!(config.ollama_num_ctx(), DEFAULT_NUM_CTX);
        assert_eq!(config.max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert!(!config.reflection());
        assert_eq!(config.collection(), DEFAULT_COLLECTION);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_merge_prefers_project_values() {
        let global: Config = toml::from_str(
            r#"
model = "global-model"
[ollama]
num_ctx = 4096
temperature = 0.5
[rag]
top_k = 3
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[ollama]
num_ctx = 2048
[agent]
reflection = true
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        assert_eq!(merged.model, "global-model");
        assert_eq!(merged.ollama.num_ctx, Some(2048));
        assert_eq!(merged.ollama.temperature, Some(0.5));
        assert_eq!(merged.agent.reflection, Some(true));
        assert_eq!(merged.rag.top_k, Some(3));
    }

    #[test]
    fn test_load_project_walks_up_to_git_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(root.path().join(".git")).unwrap();
        fs::write(
            root.path().join(PROJECT_CONFIG_FILENAME),
            "model = \"project-model\"\n",
        )
        .unwrap();

        let found = Config::load_project_from(&nested).unwrap().unwrap();
        assert_eq!(found.model, "project-model");
    }

    #[test]
    fn test_load_project_stops_at_git_root() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(
            outer.path().join(PROJECT_CONFIG_FILENAME),
            "model = \"outside\"\n",
        )
        .unwrap();
        let repo = outer.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert!(Config::load_project_from(&repo).unwrap().is_none());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "model = [").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }
}
