//! The Ollama Modelfile for the agent's model.
//!
//! The agent talks to a derived model (`llama3.1:8b-expert` by default) that
//! bakes the context size, temperature and system prompt into the base
//! model. This module renders that Modelfile from configuration and can
//! register the derived model directly through `/api/create`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map};

use crate::config::Config;
use crate::ollama::CreateModelRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelfileSpec {
    /// Name the derived model is registered under.
    pub model: String,
    pub base_model: String,
    pub num_ctx: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

impl ModelfileSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            base_model: config.base_model.clone(),
            num_ctx: config.ollama_num_ctx(),
            temperature: config.ollama_temperature(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Modelfile text, ready for `ollama create -f`.
    pub fn render(&self) -> String {
        format!(
            "FROM {}\nPARAMETER num_ctx {}\nPARAMETER temperature {}\nSYSTEM \"\"\"{}\"\"\"\n",
            self.base_model, self.num_ctx, self.temperature, self.system_prompt
        )
    }

    /// Writes the rendered Modelfile to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(path, self.render())
            .with_context(|| format!("Failed to write Modelfile to {:?}", path))
    }

    /// The `/api/create` body equivalent to this Modelfile.
    pub fn to_create_request(&self) -> CreateModelRequest {
        let mut parameters = Map::new();
        parameters.insert("num_ctx".to_string(), json!(self.num_ctx));
        parameters.insert("temperature".to_string(), json!(self.temperature));
        CreateModelRequest {
            model: self.model.clone(),
            from: self.base_model.clone(),
            system: self.system_prompt.clone(),
            parameters,
            stream: false,
        }
    }
}
