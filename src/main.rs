//! Entry point for hearth, a local tool-using agent with document retrieval.
//!
//! Loads environment variables, parses CLI arguments via [`cli`], and
//! dispatches to the chosen subcommand handler.

mod agent;
mod chat;
mod cli;
mod config;
mod constants;
mod logging;
mod message;
mod modelfile;
mod ollama;
mod output;
mod rag;
mod session;
mod tools;

use anyhow::Result;

/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments and runs the subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    cli::run(cli).await
}
