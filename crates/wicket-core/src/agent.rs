//! The tool-calling agent loop.
//!
//! One `run` drives the model-call / tool-call / final-answer state machine:
//! call the provider with the working context, parse the reply, execute a
//! requested tool, feed the result back, repeat until the model answers or
//! the step budget runs out. Tool failures never abort the loop; they become
//! observations the model can react to.

use crate::context::ConversationContext;
use crate::message::Message;
use serde_json::Value;
use std::sync::Arc;
use wicket_provider::{Provider, ProviderError, ProviderMessage};
use wicket_tools::{ToolContext, ToolRegistry};

const DEFAULT_MAX_TOOL_STEPS: usize = 4;
const EXHAUSTED_REPLY: &str = "I could not complete the request within the allowed tool steps.";

/// Errors the runtime can surface to its caller.
///
/// Everything else — malformed model output, unknown tools, tool failures —
/// degrades into text the model (or user) sees.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A parsed model reply.
///
/// The fallback arm of every parse path is `Final` carrying the raw text:
/// models that ignore the JSON protocol still produce usable output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final { content: String },
    ToolCall { tool: String, input: String },
}

/// Drives the provider and the tool registry for one turn at a time.
pub struct AgentRuntime {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    max_tool_steps: usize,
    tool_ctx: ToolContext,
}

impl AgentRuntime {
    /// Create a runtime with default step budget and tool context.
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            system_prompt: None,
            max_tool_steps: DEFAULT_MAX_TOOL_STEPS,
            tool_ctx: ToolContext::default(),
        }
    }

    /// Set the configured system prompt, prepended to every working context.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Bound the number of tool steps per turn.
    pub fn with_max_tool_steps(mut self, steps: usize) -> Self {
        self.max_tool_steps = steps;
        self
    }

    /// Set the execution context handed to tools.
    pub fn with_tool_context(mut self, ctx: ToolContext) -> Self {
        self.tool_ctx = ctx;
        self
    }

    /// Run one turn and return the final answer text.
    ///
    /// Builds a working copy of the context (system prompt, tool prompt,
    /// prior history, new user turn — in that order; providers treat
    /// position as role priority) and loops until the model produces a
    /// final answer or `max_tool_steps` is exhausted. The caller owns
    /// persistence; the runtime never touches the session store.
    pub async fn run(
        &self,
        input: &str,
        prior: &ConversationContext,
    ) -> Result<String, AgentError> {
        let mut working = ConversationContext::new();
        if let Some(ref prompt) = self.system_prompt {
            working.add_system(prompt.clone());
        }
        working.add_system(self.build_tool_prompt());
        working.extend_from(prior);
        working.add_user(input);

        for step in 0..self.max_tool_steps {
            let raw = self.provider.complete(&to_provider(&working)).await?;

            match parse_model_reply(&raw) {
                ModelReply::Final { content } => return Ok(content),
                ModelReply::ToolCall { tool, input } => {
                    let result = if !self.tools.has(&tool) {
                        format!("Tool not found: {tool}")
                    } else {
                        match self.tools.run(&tool, &input, &self.tool_ctx).await {
                            Ok(output) => output,
                            Err(e) => format!("Tool error: {e}"),
                        }
                    };
                    tracing::debug!(step, tool = %tool, "tool call completed");

                    // The raw tool-call text goes back verbatim so the model
                    // sees its own prior call on the next iteration.
                    working.add_assistant(raw);
                    working.add_system(format!("Tool result ({tool}): {result}"));
                }
            }
        }

        Ok(EXHAUSTED_REPLY.to_string())
    }

    fn build_tool_prompt(&self) -> String {
        let mut lines = vec![
            "You can call tools when needed.".to_string(),
            "When you want to call a tool, respond with JSON only:".to_string(),
            r#"{"type":"tool_call","tool":"NAME","input":"STRING_OR_JSON"}"#.to_string(),
            "When you want to respond to the user, respond with JSON only:".to_string(),
            r#"{"type":"final","content":"YOUR_RESPONSE"}"#.to_string(),
        ];

        let tips: Vec<String> = self
            .tools
            .list()
            .iter()
            .filter_map(|t| t.usage().map(|u| format!("- {}: {u}", t.name())))
            .collect();
        if !tips.is_empty() {
            lines.push("Tool input tips:".to_string());
            lines.extend(tips);
        }

        lines.push("Available tools:".to_string());
        if self.tools.is_empty() {
            lines.push("- (no tools available)".to_string());
        } else {
            for tool in self.tools.list() {
                lines.push(format!("- {}: {}", tool.name(), tool.description()));
            }
        }
        lines.push("Do not include any extra keys or commentary outside the JSON object.".to_string());
        lines.join("\n")
    }
}

fn to_provider(context: &ConversationContext) -> Vec<ProviderMessage> {
    context
        .messages()
        .iter()
        .map(|m: &Message| ProviderMessage::new(m.role.to_string(), m.content.clone()))
        .collect()
}

/// Parse raw model output into a [`ModelReply`]. Never fails.
pub fn parse_model_reply(raw: &str) -> ModelReply {
    let cleaned = strip_code_fence(raw.trim());

    if cleaned.starts_with('{') && cleaned.ends_with('}') {
        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            let reply_type = value.get("type").and_then(Value::as_str);

            if reply_type == Some("tool_call") || (reply_type.is_none() && value.get("tool").is_some()) {
                let tool = value
                    .get("tool")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if !tool.is_empty() {
                    let input_value = value
                        .get("input")
                        .or_else(|| value.get("tool_input"))
                        .or_else(|| value.get("arguments"))
                        .cloned()
                        .unwrap_or(Value::String(String::new()));
                    let input = match input_value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    return ModelReply::ToolCall { tool, input };
                }
            }

            if reply_type == Some("final") {
                let content = match value.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                return ModelReply::Final { content };
            }
        }
    }

    ModelReply::Final {
        content: raw.to_string(),
    }
}

/// Strip a single wrapping fenced code block, if present.
fn strip_code_fence(input: &str) -> String {
    let Some(rest) = input.strip_prefix("```") else {
        return input.to_string();
    };
    let tag_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let rest = &rest[tag_len..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wicket_tools::{Tool, ToolError};

    /// Provider returning scripted replies, recording what it was sent.
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<ProviderMessage>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Vec<ProviderMessage> {
            self.seen.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(&self, messages: &[ProviderMessage]) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::ApiError("script exhausted".to_string()))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input back"
        }
        async fn run(&self, input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok(format!("echoed: {input}"))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn run(&self, _input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
            Err(ToolError::Execution("boom".to_string()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool));
        tools.register(Arc::new(FailingTool));
        tools
    }

    #[test]
    fn test_parse_final() {
        assert_eq!(
            parse_model_reply(r#"{"type":"final","content":"done"}"#),
            ModelReply::Final {
                content: "done".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tool_call() {
        assert_eq!(
            parse_model_reply(r#"{"type":"tool_call","tool":"bash","input":"ls"}"#),
            ModelReply::ToolCall {
                tool: "bash".to_string(),
                input: "ls".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tool_without_type() {
        assert_eq!(
            parse_model_reply(r#"{"tool":"bash","input":"ls"}"#),
            ModelReply::ToolCall {
                tool: "bash".to_string(),
                input: "ls".to_string()
            }
        );
    }

    #[test]
    fn test_parse_input_field_fallbacks() {
        assert_eq!(
            parse_model_reply(r#"{"type":"tool_call","tool":"t","tool_input":"a"}"#),
            ModelReply::ToolCall {
                tool: "t".to_string(),
                input: "a".to_string()
            }
        );
        assert_eq!(
            parse_model_reply(r#"{"type":"tool_call","tool":"t","arguments":"b"}"#),
            ModelReply::ToolCall {
                tool: "t".to_string(),
                input: "b".to_string()
            }
        );
    }

    #[test]
    fn test_parse_coerces_structured_input() {
        let reply =
            parse_model_reply(r#"{"type":"tool_call","tool":"files","input":{"action":"read"}}"#);
        match reply {
            ModelReply::ToolCall { input, .. } => {
                let parsed: Value = serde_json::from_str(&input).unwrap();
                assert_eq!(parsed["action"], "read");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_json_degrades_to_final() {
        assert_eq!(
            parse_model_reply("Sure! Here's what I found."),
            ModelReply::Final {
                content: "Sure! Here's what I found.".to_string()
            }
        );
    }

    #[test]
    fn test_parse_broken_json_degrades_to_raw() {
        let raw = r#"{"type":"tool_call","tool":"#;
        assert_eq!(
            parse_model_reply(raw),
            ModelReply::Final {
                content: raw.to_string()
            }
        );
    }

    #[test]
    fn test_parse_unrecognized_shape_degrades_to_raw() {
        let raw = r#"{"kind":"other"}"#;
        assert_eq!(
            parse_model_reply(raw),
            ModelReply::Final {
                content: raw.to_string()
            }
        );
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("no fence"), "no fence");
    }

    #[tokio::test]
    async fn test_fenced_final_reply() {
        let provider = ScriptedProvider::new(&["```json\n{\"type\":\"final\",\"content\":\"hi\"}\n```"]);
        let runtime = AgentRuntime::new(provider.clone(), registry());

        let out = runtime.run("hello", &ConversationContext::new()).await.unwrap();
        assert_eq!(out, "hi");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_then_final() {
        let provider = ScriptedProvider::new(&[
            r#"{"type":"tool_call","tool":"echo","input":"ping"}"#,
            r#"{"type":"final","content":"pong"}"#,
        ]);
        let runtime = AgentRuntime::new(provider.clone(), registry());

        let out = runtime.run("go", &ConversationContext::new()).await.unwrap();
        assert_eq!(out, "pong");
        assert_eq!(provider.calls(), 2);

        // The second request carries the raw call and its result.
        let request = provider.last_request();
        let tail: Vec<&str> = request.iter().rev().take(2).map(|m| m.content.as_str()).collect();
        assert_eq!(tail[0], "Tool result (echo): echoed: ping");
        assert!(tail[1].contains("\"tool\":\"echo\""));
    }

    #[tokio::test]
    async fn test_unknown_tool_feeds_back() {
        let provider = ScriptedProvider::new(&[
            r#"{"type":"tool_call","tool":"ghost","input":""}"#,
            r#"{"type":"final","content":"ok"}"#,
        ]);
        let runtime = AgentRuntime::new(provider.clone(), registry());

        let out = runtime.run("go", &ConversationContext::new()).await.unwrap();
        assert_eq!(out, "ok");

        let request = provider.last_request();
        let feedback = request.last().unwrap();
        assert_eq!(feedback.content, "Tool result (ghost): Tool not found: ghost");
        assert_eq!(feedback.role, "system");
    }

    #[tokio::test]
    async fn test_tool_error_feeds_back() {
        let provider = ScriptedProvider::new(&[
            r#"{"type":"tool_call","tool":"broken","input":"x"}"#,
            r#"{"type":"final","content":"recovered"}"#,
        ]);
        let runtime = AgentRuntime::new(provider.clone(), registry());

        let out = runtime.run("go", &ConversationContext::new()).await.unwrap();
        assert_eq!(out, "recovered");

        let request = provider.last_request();
        let feedback = request.last().unwrap();
        assert_eq!(feedback.content, "Tool result (broken): Tool error: boom");
    }

    #[tokio::test]
    async fn test_exhaustion_returns_fallback() {
        let provider = ScriptedProvider::new(&[
            r#"{"type":"tool_call","tool":"echo","input":"1"}"#,
            r#"{"type":"tool_call","tool":"echo","input":"2"}"#,
            r#"{"type":"final","content":"never reached"}"#,
        ]);
        let runtime = AgentRuntime::new(provider.clone(), registry()).with_max_tool_steps(2);

        let out = runtime.run("loop", &ConversationContext::new()).await.unwrap();
        assert_eq!(out, EXHAUSTED_REPLY);
        // Never calls the provider a third time.
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = ScriptedProvider::new(&[]);
        let runtime = AgentRuntime::new(provider, registry());
        let result = runtime.run("go", &ConversationContext::new()).await;
        assert!(matches!(result, Err(AgentError::Provider(_))));
    }

    #[tokio::test]
    async fn test_working_context_ordering() {
        let provider = ScriptedProvider::new(&[r#"{"type":"final","content":"done"}"#]);
        let runtime = AgentRuntime::new(provider.clone(), registry())
            .with_system_prompt("You are a careful assistant.");

        let mut prior = ConversationContext::new();
        prior.add(Message::new(Role::User, "earlier question"));
        prior.add(Message::new(Role::Assistant, "earlier answer"));

        runtime.run("new question", &prior).await.unwrap();

        let request = provider.last_request();
        assert_eq!(request[0].role, "system");
        assert_eq!(request[0].content, "You are a careful assistant.");
        assert_eq!(request[1].role, "system");
        assert!(request[1].content.contains("Available tools:"));
        assert!(request[1].content.contains("- echo: Echo the input back"));
        assert_eq!(request[2].content, "earlier question");
        assert_eq!(request[3].content, "earlier answer");
        assert_eq!(request[4].role, "user");
        assert_eq!(request[4].content, "new question");
    }

    #[tokio::test]
    async fn test_empty_registry_prompt() {
        let provider = ScriptedProvider::new(&[r#"{"type":"final","content":"done"}"#]);
        let runtime = AgentRuntime::new(provider.clone(), ToolRegistry::new());

        runtime.run("hi", &ConversationContext::new()).await.unwrap();
        let request = provider.last_request();
        assert!(request[0].content.contains("- (no tools available)"));
    }
}
