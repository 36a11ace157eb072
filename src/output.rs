//! Output rendering for hearth.
//!
//! The agent reports what it is doing through the [`Renderer`] trait so the
//! reasoning loop stays independent of the terminal. [`StdoutRenderer`]
//! prints tool activity and the final answer with `colored` styling.

use colored::Colorize;
use serde_json::Value;

use crate::constants::TOOL_PREVIEW_CHARS;
use crate::message::{Message, Role};

/// Receives agent events as they happen.
pub trait Renderer {
    /// The model asked for a tool; called before it runs.
    fn tool_start(&mut self, name: &str, args: &Value);

    /// A tool finished; `result` is the JSON text handed back to the model.
    fn tool_result(&mut self, name: &str, result: &str);

    /// The draft answer is being sent to the reviewer.
    fn reviewing(&mut self);

    /// The final answer for the turn.
    fn render_answer(&mut self, answer: &str);

    /// Called when a turn fails.
    fn render_error(&mut self, err: &str);
}

/// Renders agent events to the terminal.
///
/// Tool traffic goes to stderr so `hearth ask` output can be piped; the
/// answer goes to stdout.
#[derive(Default)]
pub struct StdoutRenderer {
    tool_calls: usize,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tool calls seen so far.
    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }
}

impl Renderer for StdoutRenderer {
    fn tool_start(&mut self, name: &str, args: &Value) {
        self.tool_calls += 1;
        eprintln!("{} {}", format!("[{name}]").yellow().bold(), args.to_string().dimmed());
    }

    fn tool_result(&mut self, name: &str, result: &str) {
        let marker = if result.starts_with("{\"error\"") {
            format!("  {name} failed:").red()
        } else {
            format!("  {name} ->").dimmed()
        };
        eprintln!("{} {}", marker, preview(result, TOOL_PREVIEW_CHARS).dimmed());
    }

    fn reviewing(&mut self) {
        eprintln!("{}", "[reviewing draft]".cyan());
    }

    fn render_answer(&mut self, answer: &str) {
        println!("{answer}");
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

/// One history entry for `/history` and resumed sessions.
pub fn format_message(msg: &Message) -> String {
    match msg.role {
        Role::User => format!("{} {}", "You:".green().bold(), msg.text()),
        Role::Assistant if msg.has_tool_calls() => {
            let calls: Vec<String> = msg
                .tool_calls
                .iter()
                .map(|c| format!("{}({})", c.name(), c.function.arguments))
                .collect();
            format!("{} {}", "Agent:".cyan().bold(), calls.join(", ").dimmed())
        }
        Role::Assistant => format!("{} {}", "Agent:".cyan().bold(), msg.text()),
        Role::Tool => {
            let name = msg.tool_name.as_deref().unwrap_or("tool");
            format!(
                "{} {}",
                format!("  {name} ->").yellow(),
                preview(msg.text(), TOOL_PREVIEW_CHARS).dimmed()
            )
        }
        Role::System => format!("{} {}", "system:".dimmed(), msg.text().dimmed()),
    }
}

/// Shortens `text` to `max` characters on a char boundary, marking the cut.
pub fn preview(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    match single_line.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &single_line[..cut]),
        None => single_line,
    }
}
