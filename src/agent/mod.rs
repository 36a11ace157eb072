//! The tool-calling reasoning loop.
//!
//! [`Agent::ask`] sends the conversation to the model with the tool
//! definitions attached, runs whatever tools the model requests, feeds the
//! results back and repeats until the model answers in plain text. When the
//! iteration budget runs out the model gets one last turn without tools so
//! it has to answer from what it already has. An optional reviewer pass can
//! then revise the answer.

pub mod reflect;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::message::{Message, Role};
use crate::ollama::{ChatOptions, ChatRequest, OllamaClient, ToolSpec};
use crate::output::Renderer;
use crate::tools::ToolRegistry;

pub struct Agent {
    client: OllamaClient,
    model: String,
    options: ChatOptions,
    tools: ToolRegistry,
    tool_specs: Vec<ToolSpec>,
    history: Vec<Message>,
    max_iterations: usize,
    reflection: bool,
}

impl Agent {
    /// Creates an agent whose history holds only `system_prompt`.
    pub fn new(
        client: OllamaClient,
        model: impl Into<String>,
        system_prompt: &str,
        tools: ToolRegistry,
        options: ChatOptions,
    ) -> Self {
        let tool_specs = tools.definitions();
        Self {
            client,
            model: model.into(),
            options,
            tools,
            tool_specs,
            history: vec![Message::system(system_prompt)],
            max_iterations: crate::constants::DEFAULT_MAX_ITERATIONS,
            reflection: false,
        }
    }

    pub fn from_config(config: &Config, client: OllamaClient, tools: ToolRegistry) -> Self {
        let options = ChatOptions {
            num_ctx: config.ollama_num_ctx(),
            temperature: config.ollama_temperature(),
        };
        Self::new(client, &config.model, &config.system_prompt, tools, options)
            .with_max_iterations(config.max_iterations())
            .with_reflection(config.reflection())
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_reflection(mut self, reflection: bool) -> Self {
        self.reflection = reflection;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn reflection(&self) -> bool {
        self.reflection
    }

    pub fn set_reflection(&mut self, on: bool) {
        self.reflection = on;
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drops everything but the system prompt.
    pub fn clear(&mut self) {
        self.history.truncate(1);
    }

    /// Replaces the conversation after the system prompt with `messages`.
    ///
    /// System messages in `messages` are skipped so a resumed session keeps
    /// the current system prompt.
    pub fn restore(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.clear();
        self.history
            .extend(messages.into_iter().filter(|m| m.role != Role::System));
    }

    /// Answers `input`, running tools as the model requests them.
    ///
    /// On error the history is rolled back to where it was before the call,
    /// so a failed turn leaves no half-finished tool exchange behind.
    pub async fn ask(&mut self, input: &str, renderer: &mut dyn Renderer) -> Result<String> {
        let checkpoint = self.history.len();
        self.history.push(Message::user(input));

        match self.run_turn(renderer).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                self.history.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self, renderer: &mut dyn Renderer) -> Result<String> {
        let mut answered = false;

        for iteration in 1..=self.max_iterations {
            let reply = self.chat(true).await?;
            if !reply.has_tool_calls() {
                debug!(iteration, "model answered");
                self.history.push(Message::assistant(reply.content));
                answered = true;
                break;
            }

            debug!(iteration, calls = reply.tool_calls.len(), "model requested tools");
            let calls = reply.tool_calls.clone();
            self.history
                .push(Message::assistant_with_tools(reply.content, reply.tool_calls));

            for call in &calls {
                let result = match call.arguments() {
                    Ok(args) => {
                        renderer.tool_start(call.name(), &args);
                        self.tools.execute(call.name(), args).await
                    }
                    Err(e) => {
                        warn!(tool = call.name(), error = %e, "unusable tool arguments");
                        json!({ "error": e.to_string(), "trace": format!("{e:?}") }).to_string()
                    }
                };
                renderer.tool_result(call.name(), &result);
                self.history.push(Message::tool_result(call.name(), result));
            }
        }

        if !answered {
            warn!(
                max_iterations = self.max_iterations,
                "iteration budget exhausted, asking for a final answer without tools"
            );
            let reply = self.chat(false).await?;
            self.history.push(Message::assistant(reply.content));
        }

        if self.reflection {
            renderer.reviewing();
            self.reflect().await;
        }

        Ok(self
            .history
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }

    /// Sends the history to the model, with or without tool definitions.
    async fn chat(&self, with_tools: bool) -> Result<Message> {
        let tools: &[ToolSpec] = if with_tools { &self.tool_specs } else { &[] };
        let request = ChatRequest::new(&self.model, &self.history, tools, self.options);
        let response = self
            .client
            .chat(&request)
            .await
            .with_context(|| format!("Chat with model '{}' failed", self.model))?;
        Ok(response.message)
    }

    /// Runs the reviewer over the last assistant message. A reviewer failure
    /// keeps the draft.
    async fn reflect(&mut self) {
        let Some(draft) = self.history.last().map(|m| m.content.clone()) else {
            return;
        };
        let messages = reflect::review_messages(&draft);
        let request = ChatRequest::new(&self.model, &messages, &[], self.options);

        let review = match self.client.chat(&request).await {
            Ok(response) => response.message.content,
            Err(e) => {
                warn!(error = %e, "reviewer failed, keeping draft");
                return;
            }
        };

        if let Some(revised) = reflect::apply_review(&review) {
            debug!("reviewer revised the draft");
            if let Some(last) = self.history.last_mut() {
                *last = Message::assistant(revised);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::calculator::CalculatorTool;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    #[derive(Default)]
    struct RecordingRenderer {
        events: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn tool_start(&mut self, name: &str, args: &Value) {
            self.events.push(format!("start {name} {args}"));
        }

        fn tool_result(&mut self, name: &str, result: &str) {
            self.events.push(format!("result {name} {result}"));
        }

        fn reviewing(&mut self) {
            self.events.push("reviewing".to_string());
        }

        fn render_answer(&mut self, answer: &str) {
            self.events.push(format!("answer {answer}"));
        }

        fn render_error(&mut self, err: &str) {
            self.events.push(format!("error {err}"));
        }
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }

    fn tool_reply(name: &str, arguments: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": name, "arguments": arguments}}]
            },
            "done": true
        }))
    }

    /// Serves `replies` in order (repeating the last) and records every request body.
    async fn scripted_server(replies: Vec<ResponseTemplate>) -> (MockServer, Arc<Mutex<Vec<Value>>>) {
        let server = MockServer::start().await;
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let counter = AtomicUsize::new(0);
        let recorded = bodies.clone();
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(move |req: &Request| {
                recorded
                    .lock()
                    .unwrap()
                    .push(serde_json::from_slice::<Value>(&req.body).unwrap());
                let i = counter.fetch_add(1, Ordering::SeqCst).min(replies.len() - 1);
                replies[i].clone()
            })
            .mount(&server)
            .await;
        (server, bodies)
    }

    fn agent(server: &MockServer) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(CalculatorTool);
        let options = ChatOptions {
            num_ctx: 8192,
            temperature: 0.2,
        };
        Agent::new(OllamaClient::new(server.uri()), "test-model", "be helpful", tools, options)
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let (server, bodies) = scripted_server(vec![reply("Hello there.")]).await;
        let mut agent = agent(&server);
        let mut renderer = RecordingRenderer::default();

        let answer = agent.ask("hi", &mut renderer).await.unwrap();
        assert_eq!(answer, "Hello there.");
        assert_eq!(agent.history().len(), 3);
        assert!(renderer.events.is_empty());

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["model"], "test-model");
        assert_eq!(bodies[0]["tools"][0]["function"]["name"], "calculator");
        assert_eq!(bodies[0]["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let (server, bodies) = scripted_server(vec![
            tool_reply("calculator", json!("{\"expression\": \"6*7\"}")),
            reply("The answer is 42."),
        ])
        .await;
        let mut agent = agent(&server);
        let mut renderer = RecordingRenderer::default();

        let answer = agent.ask("what is 6*7?", &mut renderer).await.unwrap();
        assert_eq!(answer, "The answer is 42.");

        let roles: Vec<Role> = agent.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let tool_msg = &agent.history()[3];
        assert_eq!(tool_msg.tool_name.as_deref(), Some("calculator"));
        assert_eq!(tool_msg.text(), r#"{"result":"42"}"#);
        assert_eq!(
            renderer.events,
            vec![
                r#"start calculator {"expression":"6*7"}"#.to_string(),
                r#"result calculator {"result":"42"}"#.to_string(),
            ]
        );

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1]["messages"][3]["role"], "tool");
        assert_eq!(bodies[1]["messages"][3]["tool_name"], "calculator");
    }

    #[tokio::test]
    async fn test_unknown_tool_result_is_fed_back() {
        let (server, _) = scripted_server(vec![
            tool_reply("teleport", json!({})),
            reply("I cannot do that."),
        ])
        .await;
        let mut agent = agent(&server);
        let mut renderer = RecordingRenderer::default();

        let answer = agent.ask("beam me up", &mut renderer).await.unwrap();
        assert_eq!(answer, "I cannot do that.");
        assert_eq!(agent.history()[3].text(), r#"{"error":"Unknown tool teleport"}"#);
    }

    #[tokio::test]
    async fn test_budget_exhausted_forces_final_answer_without_tools() {
        let (server, bodies) = scripted_server(vec![
            tool_reply("calculator", json!({"expression": "1+1"})),
            tool_reply("calculator", json!({"expression": "1+1"})),
            reply("Giving up on tools: 2."),
        ])
        .await;
        let mut agent = agent(&server).with_max_iterations(2);
        let mut renderer = RecordingRenderer::default();

        let answer = agent.ask("loop forever", &mut renderer).await.unwrap();
        assert_eq!(answer, "Giving up on tools: 2.");

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[1].get("tools").is_some());
        assert!(bodies[2].get("tools").is_none());
    }

    #[tokio::test]
    async fn test_reflection_revises_answer() {
        let (server, bodies) = scripted_server(vec![
            reply("draft answer"),
            reply(r#"{"verdict":"revise","answer":"polished answer"}"#),
        ])
        .await;
        let mut agent = agent(&server).with_reflection(true);
        let mut renderer = RecordingRenderer::default();

        let answer = agent.ask("question", &mut renderer).await.unwrap();
        assert_eq!(answer, "polished answer");
        assert_eq!(agent.history().last().unwrap().text(), "polished answer");
        assert_eq!(renderer.events, vec!["reviewing".to_string()]);

        let bodies = bodies.lock().unwrap();
        let review = &bodies[1];
        assert!(review.get("tools").is_none());
        assert_eq!(review["messages"][0]["content"], "You are a meticulous editor.");
        assert!(review["messages"][1]["content"]
            .as_str()
            .unwrap()
            .ends_with("DRAFT:\ndraft answer"));
    }

    #[tokio::test]
    async fn test_reflection_ok_keeps_draft() {
        let (server, _) = scripted_server(vec![reply("draft answer"), reply("OK")]).await;
        let mut agent = agent(&server).with_reflection(true);
        let mut renderer = RecordingRenderer::default();
        let answer = agent.ask("question", &mut renderer).await.unwrap();
        assert_eq!(answer, "draft answer");
    }

    #[tokio::test]
    async fn test_error_rolls_back_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model crashed"})))
            .mount(&server)
            .await;
        let mut agent = agent(&server);
        let mut renderer = RecordingRenderer::default();

        let err = agent.ask("hi", &mut renderer).await.unwrap_err();
        assert!(format!("{err:#}").contains("model crashed"));
        assert_eq!(agent.history().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_keeps_current_system_prompt() {
        let server = MockServer::start().await;
        let mut agent = agent(&server);
        agent.restore(vec![
            Message::system("old prompt"),
            Message::user("earlier question"),
            Message::assistant("earlier answer"),
        ]);
        let history = agent.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text(), "be helpful");
        assert_eq!(history[1].text(), "earlier question");

        agent.clear();
        assert_eq!(agent.history().len(), 1);
    }
}
