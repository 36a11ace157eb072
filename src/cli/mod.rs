//! Command-line interface definition and dispatch for hearth.
//!
//! Uses [`clap`] derive macros for argument parsing. Each subcommand is
//! routed to its handler; session operations live in the [`session`]
//! submodule.

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use crate::agent::Agent;
use crate::config::Config;
use crate::modelfile::ModelfileSpec;
use crate::ollama::OllamaClient;
use crate::output::{Renderer, StdoutRenderer};
use crate::rag::Rag;
use crate::tools::retrieve::RetrieveTool;
use crate::tools::web_search::WebSearchTool;
use crate::tools::ToolRegistry;
use crate::{chat, logging};

/// Top-level CLI structure for hearth.
#[derive(Parser)]
#[command(
    name = "hearth",
    version,
    about = "A local tool-using agent with document retrieval, running on Ollama"
)]
pub struct Cli {
    /// Show debug logs (HEARTH_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands. The `///` doc comments double as `--help` text.
#[derive(Subcommand)]
pub enum Commands {
    /// Ask a one-shot question
    Ask {
        /// The question to ask
        prompt: Vec<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// Review the answer before printing it
        #[arg(long)]
        reflect: bool,
        /// Maximum model round-trips with tools
        #[arg(long = "max-iters")]
        max_iters: Option<usize>,
    },
    /// Start an interactive chat session
    Chat {
        /// Resume a specific session (supports partial IDs)
        #[arg(short, long)]
        session: Option<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// Review each answer before printing it
        #[arg(long)]
        reflect: bool,
    },
    /// Ingest .txt, .md and .pdf files into the vector store
    Ingest {
        /// Folder to ingest (defaults to rag.docs_dir)
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Retrieve the chunks most similar to a query
    Query {
        /// Query text
        #[arg(long)]
        q: String,
        /// Number of chunks to return
        #[arg(long)]
        k: Option<usize>,
    },
    /// List models available on the Ollama server
    Models,
    /// Render or register the agent's Modelfile
    Modelfile {
        #[command(subcommand)]
        action: ModelfileAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum ModelfileAction {
    /// Print the Modelfile
    Show,
    /// Write the Modelfile to disk
    Write {
        /// Destination path
        #[arg(default_value = "Modelfile")]
        path: PathBuf,
    },
    /// Register the model with the Ollama server
    Create,
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config
    Show,
    /// Print the global config file path
    Path,
}

/// Subcommands for the `session` command.
#[derive(Subcommand)]
pub enum SessionAction {
    /// List all sessions
    List,
    /// Resume a session by ID (supports partial IDs)
    Resume { id: String },
    /// Delete a session by ID (supports partial IDs)
    Delete { id: String },
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose);

    match cli.command {
        Commands::Ask {
            prompt,
            model,
            reflect,
            max_iters,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: hearth ask \"your question here\"");
            }

            let mut config = Config::load()?;
            apply_overrides(&mut config, model, reflect);
            if let Some(n) = max_iters {
                config.agent.max_iterations = Some(n);
            }

            let (mut agent, _rag) = build_agent(&config)?;
            let mut renderer = StdoutRenderer::new();
            let answer = agent.ask(&prompt, &mut renderer).await?;
            renderer.render_answer(&answer);
            if renderer.tool_calls() > 0 {
                eprintln!("{}", format!("[{} tool calls]", renderer.tool_calls()).dimmed());
            }
            Ok(())
        }
        Commands::Chat {
            session,
            model,
            reflect,
        } => {
            let mut config = Config::load()?;
            apply_overrides(&mut config, model, reflect);
            let (agent, rag) = build_agent(&config)?;
            chat::run_chat(agent, rag, config.docs_dir(), session).await
        }
        Commands::Ingest { folder } => {
            let config = Config::load()?;
            let folder = folder.unwrap_or_else(|| config.docs_dir());
            let rag = Rag::from_config(&config, client(&config));
            let report = rag.ingest(&folder).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Query { q, k } => {
            let config = Config::load()?;
            let rag = Rag::from_config(&config, client(&config));
            let chunks = rag
                .retrieve_chunks(&q, k.unwrap_or_else(|| config.top_k()))
                .await?;
            println!("{}", serde_json::to_string_pretty(&chunks)?);
            Ok(())
        }
        Commands::Models => {
            let config = Config::load()?;
            list_models(&config).await
        }
        Commands::Modelfile { action } => {
            let config = Config::load()?;
            let spec = ModelfileSpec::from_config(&config);
            match action {
                ModelfileAction::Show => print!("{}", spec.render()),
                ModelfileAction::Write { path } => {
                    spec.write(&path)?;
                    println!("{} {}", "Wrote".green(), path.display());
                }
                ModelfileAction::Create => {
                    client(&config)
                        .create_model(&spec.to_create_request())
                        .await
                        .with_context(|| format!("Failed to create model '{}'", spec.model))?;
                    println!(
                        "{} {} from {}",
                        "Created".green(),
                        spec.model.yellow(),
                        spec.base_model
                    );
                }
            }
            Ok(())
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let config = Config::load()?;
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!("{} {}", "Ollama:".bold(), config.ollama_base_url());
                    println!();
                    println!("{}", toml::to_string_pretty(&config)?);
                }
                ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            }
            Ok(())
        }
        Commands::Session { action } => session::handle_session(action).await,
    }
}

fn apply_overrides(config: &mut Config, model: Option<String>, reflect: bool) {
    if let Some(model) = model {
        config.model = model;
    }
    if reflect {
        config.agent.reflection = Some(true);
    }
}

fn client(config: &Config) -> OllamaClient {
    OllamaClient::new(config.ollama_base_url())
}

/// Wires the Ollama client, retrieval and the built-in tools into an agent.
pub(crate) fn build_agent(config: &Config) -> Result<(Agent, Arc<Rag>)> {
    let client = client(config);
    let rag = Arc::new(Rag::from_config(config, client.clone()));
    let search = WebSearchTool::from_config(config)?;
    let retrieve = RetrieveTool::new(rag.clone(), config.top_k());
    let tools = ToolRegistry::with_builtins(search, retrieve);
    debug!(tools = ?tools.names(), base_url = client.base_url(), "assembled agent");
    Ok((Agent::from_config(config, client, tools), rag))
}

async fn list_models(config: &Config) -> Result<()> {
    let client = client(config);
    let models = client
        .list_models()
        .await
        .with_context(|| format!("Failed to list models at {}", client.base_url()))?;

    if models.is_empty() {
        println!("{}", "No models installed.".dimmed());
    }
    for name in &models {
        if *name == config.model || *name == format!("{}:latest", config.model) {
            println!("{} {}", "*".green(), name.green().bold());
        } else {
            println!("  {}", name);
        }
    }
    if !models.iter().any(|m| m.starts_with(&config.model)) {
        println!();
        println!(
            "{} '{}' is not installed. Create it with: {}",
            "note:".yellow(),
            config.model,
            "hearth modelfile create".cyan()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_flags() {
        let cli = Cli::try_parse_from([
            "hearth", "-v", "ask", "what", "is", "2+2", "--reflect", "--max-iters", "3",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ask {
                prompt,
                reflect,
                max_iters,
                model,
            } => {
                assert_eq!(prompt.join(" "), "what is 2+2");
                assert!(reflect);
                assert_eq!(max_iters, Some(3));
                assert_eq!(model, None);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_query_and_modelfile() {
        let cli = Cli::try_parse_from(["hearth", "query", "--q", "ownership", "--k", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Query { ref q, k: Some(2) } if q == "ownership"));

        let cli = Cli::try_parse_from(["hearth", "modelfile", "write"]).unwrap();
        match cli.command {
            Commands::Modelfile {
                action: ModelfileAction::Write { path },
            } => assert_eq!(path, PathBuf::from("Modelfile")),
            _ => panic!("expected modelfile write"),
        }
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        apply_overrides(&mut config, Some("other".to_string()), true);
        assert_eq!(config.model, "other");
        assert!(config.reflection());
    }

    #[test]
    fn test_build_agent_registers_builtins() {
        let config = Config::default();
        let (agent, _rag) = build_agent(&config).unwrap();
        assert_eq!(agent.model(), config.model);
        assert!(!agent.reflection());
    }
}
