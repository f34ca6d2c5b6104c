//! Bounded ReAct (reason + act) loop.
//!
//! Each step asks the model for one JSON decision:
//!
//! ```json
//! {"thought": "...", "action": "search" | "visit" | "answer", "action_input": "..."}
//! ```
//!
//! The decision is pulled from the reply content, or from the reasoning
//! trace when the content holds none. `answer` ends the loop; any registered
//! tool runs and its observation is appended to the history as a user
//! message. The loop stops after `max_steps` model calls.
//!
//! ```rust,no_run
//! use llmkit::clients::openai::OpenAICompatibleClient;
//! use llmkit::client_wrapper::NoopSink;
//! use llmkit::react_agent::ReActAgent;
//! use llmkit::search::exa::ExaClient;
//! use llmkit::tool_protocol::ToolRegistry;
//! use llmkit::tool_protocols::WebResearchProtocol;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = Arc::new(OpenAICompatibleClient::siliconflow(
//!     &std::env::var("SILICONFLOW_API_KEY")?,
//!     "deepseek-ai/DeepSeek-V3.2",
//! ));
//! let exa = Arc::new(ExaClient::new(&std::env::var("EXA_API_KEY")?));
//! let tools = ToolRegistry::from_protocol(Arc::new(WebResearchProtocol::new(exa))).await?;
//!
//! let outcome = ReActAgent::new(client, tools).run("How fast is Rust?", &NoopSink).await;
//! println!("{:?}", outcome.answer);
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::sync::Arc;

use crate::client_wrapper::{stream_chat, ChatOptions, ClientWrapper, Message, StreamSink};
use crate::event::{AgentEvent, DecisionSource, EventHandler, Termination};
use crate::json_extract::extract_json;
use crate::tool_protocol::ToolRegistry;

pub const DEFAULT_MAX_STEPS: usize = 7;

/// Action name that ends the loop.
pub const ANSWER_ACTION: &str = "answer";

/// User message pushed when no decision could be parsed.
pub const PARSE_RETRY_MESSAGE: &str = "Error: No valid JSON found. Please output ONLY JSON.";

const DEFAULT_PERSONA: &str = "You are a research assistant that answers questions by searching and reading the web.";

/// One parsed model decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    /// The JSON object as the model emitted it.
    pub raw: Value,
}

impl Decision {
    /// Build from a JSON object carrying an `action`; anything else is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.get("action").map_or(true, Value::is_null) {
            return None;
        }
        let field = |key: &str| match map.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Some(Decision {
            thought: field("thought"),
            action: field("action"),
            action_input: field("action_input"),
            raw: value.clone(),
        })
    }

    /// Look in the content first, then in the reasoning trace.
    pub fn extract(content: &str, reasoning: &str) -> Option<(Self, DecisionSource)> {
        if let Some(decision) = extract_json(content).and_then(Decision::from_value) {
            return Some((decision, DecisionSource::Content));
        }
        log::info!("Decision::extract: looking into reasoning trace");
        extract_json(reasoning)
            .and_then(Decision::from_value)
            .map(|d| (d, DecisionSource::Reasoning))
    }
}

/// Record of one tool step.
#[derive(Debug, Clone)]
pub struct ReActStep {
    pub step: usize,
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

/// Result of [`ReActAgent::run`].
#[derive(Debug, Clone)]
pub struct ReActOutcome {
    /// Final answer when the model chose `answer`.
    pub answer: Option<String>,
    /// Model calls made.
    pub steps: usize,
    pub termination: Termination,
    pub trace: Vec<ReActStep>,
    /// Full conversation as sent on the last call.
    pub messages: Vec<Message>,
}

pub struct ReActAgent {
    client: Arc<dyn ClientWrapper>,
    tools: ToolRegistry,
    max_steps: usize,
    options: ChatOptions,
    persona: String,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ReActAgent {
    pub fn new(client: Arc<dyn ClientWrapper>, tools: ToolRegistry) -> Self {
        ReActAgent {
            client,
            tools,
            max_steps: DEFAULT_MAX_STEPS,
            options: ChatOptions::new()
                .with_json_mode()
                .with_thinking(true)
                .with_temperature(0.5)
                .with_max_tokens(4096),
            persona: DEFAULT_PERSONA.to_string(),
            event_handler: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the opening line of the system prompt.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_agent_event(&event).await;
        }
    }

    /// System prompt listing the registered tools and the decision formats.
    pub fn system_prompt(&self) -> String {
        let tools = self.tools.list_tools();
        let mut prompt = format!("{}\n\nTOOLS:\n", self.persona);
        for (i, tool) in tools.iter().enumerate() {
            prompt.push_str(&format!("{}. \"{}\": {}\n", i + 1, tool.name, tool.description));
        }
        prompt.push_str(
            "\nPROTOCOL:\n1. Output decision in STRICT JSON format.\n2. Output exactly one decision per reply.\n\nJSON FORMATS:\n",
        );
        for tool in &tools {
            let input = tool.primary_parameter().unwrap_or("input");
            prompt.push_str(&format!(
                "\n[{}]:\n{{\"thought\": \"Why this tool helps...\", \"action\": \"{}\", \"action_input\": \"<{}>\"}}\n",
                tool.name, tool.name, input
            ));
        }
        prompt.push_str(
            "\n[Answer]:\n{\"thought\": \"I have enough info...\", \"action\": \"answer\", \"action_input\": \"Final answer\"}\n",
        );
        prompt
    }

    /// Run the loop for `query`, streaming model deltas into `sink`.
    pub async fn run(&self, query: &str, sink: &dyn StreamSink) -> ReActOutcome {
        let mut messages = vec![Message::system(self.system_prompt()), Message::user(query)];
        let mut trace = Vec::new();
        let mut step = 0;

        log::info!("ReActAgent::run: {}", query);
        self.emit(AgentEvent::Started {
            query: query.to_string(),
            max_steps: self.max_steps,
        })
        .await;

        while step < self.max_steps {
            step += 1;
            self.emit(AgentEvent::LLMCallStarted { step }).await;

            let response = match stream_chat(self.client.as_ref(), &messages, &self.options, sink).await {
                Ok(response) => response,
                Err(err) => {
                    log::error!("ReActAgent::run: step {} request failed: {}", step, err);
                    Default::default()
                }
            };
            self.emit(AgentEvent::LLMCallCompleted {
                step,
                content_length: response.content.len(),
                reasoning_length: response.reasoning.len(),
            })
            .await;

            if response.is_empty() {
                return self
                    .finish(None, step, Termination::EmptyResponse, trace, messages)
                    .await;
            }

            let (decision, source) = match Decision::extract(&response.content, &response.reasoning) {
                Some(found) => found,
                None => {
                    log::warn!("ReActAgent::run: step {} produced no decision", step);
                    self.emit(AgentEvent::ParseFailed { step }).await;
                    messages.push(Message::user(PARSE_RETRY_MESSAGE));
                    continue;
                }
            };

            self.emit(AgentEvent::DecisionParsed {
                step,
                source,
                thought: decision.thought.clone(),
                action: decision.action.clone(),
                action_input: decision.action_input.clone(),
            })
            .await;

            if decision.action == ANSWER_ACTION {
                return self
                    .finish(
                        Some(decision.action_input),
                        step,
                        Termination::Answered,
                        trace,
                        messages,
                    )
                    .await;
            }

            let (observation, success) = self.observe(&decision).await;
            self.emit(AgentEvent::ToolExecuted {
                step,
                action: decision.action.clone(),
                observation_length: observation.len(),
                success,
            })
            .await;

            messages.push(Message::assistant(decision.raw.to_string()));
            messages.push(Message::user(format!(
                "Observation from {}:\n{}",
                decision.action, observation
            )));
            trace.push(ReActStep {
                step,
                thought: decision.thought,
                action: decision.action,
                action_input: decision.action_input,
                observation,
            });
        }

        log::warn!("ReActAgent::run: max steps reached ({})", self.max_steps);
        self.finish(None, step, Termination::MaxStepsReached, trace, messages)
            .await
    }

    async fn observe(&self, decision: &Decision) -> (String, bool) {
        if self.tools.get_tool(&decision.action).is_none() {
            return (format!("Unknown action: {}", decision.action), false);
        }
        match self
            .tools
            .execute_with_input(&decision.action, &decision.action_input)
            .await
        {
            Ok(result) => (result.observation(), result.success),
            Err(err) => (format!("{} failed: {}", decision.action, err), false),
        }
    }

    async fn finish(
        &self,
        answer: Option<String>,
        steps: usize,
        termination: Termination,
        trace: Vec<ReActStep>,
        messages: Vec<Message>,
    ) -> ReActOutcome {
        self.emit(AgentEvent::Terminated {
            steps,
            reason: termination,
        })
        .await;
        ReActOutcome {
            answer,
            steps,
            termination,
            trace,
            messages,
        }
    }
}
