//! Provider-neutral chat types and the [`ClientWrapper`] trait.
//!
//! A `ClientWrapper` speaks to one chat-completion backend. It does not keep
//! conversation state; callers own the message history (see
//! [`crate::conversation::Conversation`] and [`crate::react_agent::ReActAgent`]).
//!
//! Reasoning-capable models return two text channels: the answer (`content`)
//! and an internal monologue (`reasoning_content`). Both are surfaced on
//! [`MessageChunk`] and [`ChatResponse`] so tools can print, persist or
//! mine the reasoning trace.
//!
//! # Example
//!
//! ```rust,no_run
//! use llmkit::client_wrapper::{ChatOptions, ClientWrapper, Message};
//! use llmkit::clients::openai::OpenAICompatibleClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let client = OpenAICompatibleClient::siliconflow(
//!     &std::env::var("SILICONFLOW_API_KEY")?,
//!     "deepseek-ai/DeepSeek-V3.2",
//! );
//! let reply = client
//!     .send_message(
//!         &[Message::system("You are terse."), Message::user("Say hi")],
//!         &ChatOptions::new().with_temperature(0.3),
//!     )
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::pin::Pin;
use std::sync::Mutex;

/// Result alias shared by every client operation.
pub type ClientResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Stream of incremental chunks produced by [`ClientWrapper::send_message_stream`].
pub type MessageChunkStream = Pin<Box<dyn Stream<Item = ClientResult<MessageChunk>> + Send>>;

/// Errors raised by chat clients.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// The provider needs a key and none was configured.
    MissingApiKey(String),
    /// The provider answered with a non-2xx status.
    Api { status: u16, body: String },
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// The response body did not have the expected shape.
    Decode(String),
    /// A streaming body broke off mid-way.
    Stream(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::MissingApiKey(var) => write!(f, "Missing API key: set {}", var),
            ClientError::Api { status, body } => write!(f, "API error {}: {}", status, body),
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ClientError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ClientError::Stream(msg) => write!(f, "Stream error: {}", msg),
        }
    }
}

impl Error for ClientError {}

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Image reference carried inside a multimodal message (usually a `data:` URL).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Base64 audio payload carried inside a multimodal message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

/// One element of a multimodal message body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    InputAudio { input_audio: InputAudio },
}

impl ContentPart {
    /// Text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Image part from raw base64 data and its mime type.
    pub fn image_base64(mime: &str, data: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime, data),
            },
        }
    }
}

/// Message body: plain text or a list of parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenate every text element, ignoring media parts.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A chat message. `reasoning` is kept for display and persistence only and is
/// never sent back to a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach a reasoning trace (builder pattern). Blank traces are dropped.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        self.reasoning = if reasoning.trim().is_empty() {
            None
        } else {
            Some(reasoning)
        };
        self
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Sampling and request-shape knobs for a single call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Ask for `response_format: {"type": "json_object"}`.
    pub json_mode: bool,
    /// Request the provider's thinking mode; only honoured for hybrid models.
    pub enable_thinking: Option<bool>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_thinking(mut self, enabled: bool) -> Self {
        self.enable_thinking = Some(enabled);
        self
    }
}

/// Represents a chunk of a streaming message response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageChunk {
    /// Incremental answer text.
    pub content: String,
    /// Incremental reasoning text (`reasoning_content` / `thinking`).
    pub reasoning: String,
    /// Set on the last chunk of a choice.
    pub finish_reason: Option<String>,
}

/// A complete model reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub reasoning: String,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// True when neither channel carried any text.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }

    /// Convert into an assistant [`Message`] carrying the reasoning trace.
    pub fn into_message(self) -> Message {
        Message::assistant(self.content).with_reasoning(self.reasoning)
    }
}

/// Receiver for live stream deltas, e.g. a terminal printer.
pub trait StreamSink: Send + Sync {
    fn on_content(&self, _delta: &str) {}
    fn on_reasoning(&self, _delta: &str) {}
}

/// Sink that discards everything.
pub struct NoopSink;

impl StreamSink for NoopSink {}

/// Trait defining the interface to interact with chat-completion services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Model identifier injected into every request.
    fn model_name(&self) -> &str;

    /// Send the messages and wait for the full reply.
    async fn send_message(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<ChatResponse>;

    /// Send the messages and receive the reply incrementally.
    ///
    /// The default implementation performs a blocking [`send_message`](Self::send_message)
    /// and yields its result as one final chunk, so every client can be consumed
    /// through the streaming path.
    async fn send_message_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<MessageChunkStream> {
        let response = self.send_message(messages, options).await?;
        let chunk: ClientResult<MessageChunk> = Ok(MessageChunk {
            content: response.content,
            reasoning: response.reasoning,
            finish_reason: Some("stop".to_string()),
        });
        Ok(Box::pin(futures_util::stream::once(async move { chunk })))
    }

    /// Usage reported by the most recent non-streaming call.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    /// Clients that track usage expose their slot here.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        None
    }
}

/// Drain a chunk stream into a [`ChatResponse`], forwarding deltas to `sink`.
///
/// A mid-stream error is returned only if nothing was received yet; otherwise
/// the partial reply is kept and the error logged.
pub async fn collect_stream(
    mut stream: MessageChunkStream,
    sink: &dyn StreamSink,
) -> ClientResult<ChatResponse> {
    let mut response = ChatResponse::default();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                if !chunk.reasoning.is_empty() {
                    sink.on_reasoning(&chunk.reasoning);
                    response.reasoning.push_str(&chunk.reasoning);
                }
                if !chunk.content.is_empty() {
                    sink.on_content(&chunk.content);
                    response.content.push_str(&chunk.content);
                }
            }
            Err(err) => {
                if response.is_empty() {
                    return Err(err);
                }
                log::warn!("collect_stream: stream ended early: {}", err);
                break;
            }
        }
    }
    Ok(response)
}

/// Stream a request through `client` and collect the full reply.
pub async fn stream_chat(
    client: &dyn ClientWrapper,
    messages: &[Message],
    options: &ChatOptions,
    sink: &dyn StreamSink,
) -> ClientResult<ChatResponse> {
    let stream = client.send_message_stream(messages, options).await?;
    collect_stream(stream, sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        content: StdMutex<Vec<String>>,
        reasoning: StdMutex<Vec<String>>,
    }

    impl StreamSink for Recorder {
        fn on_content(&self, delta: &str) {
            self.content.lock().unwrap().push(delta.to_string());
        }
        fn on_reasoning(&self, delta: &str) {
            self.reasoning.lock().unwrap().push(delta.to_string());
        }
    }

    fn chunk(content: &str, reasoning: &str) -> ClientResult<MessageChunk> {
        Ok(MessageChunk {
            content: content.to_string(),
            reasoning: reasoning.to_string(),
            finish_reason: None,
        })
    }

    #[test]
    fn test_message_serialization_shapes() {
        let plain = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(plain, serde_json::json!({"role": "user", "content": "hi"}));

        let multimodal = Message::user(MessageContent::Parts(vec![
            ContentPart::image_base64("image/png", "AAAA"),
            ContentPart::text("what is this?"),
        ]));
        let value = serde_json::to_value(&multimodal).unwrap();
        assert_eq!(value["content"][0]["type"], "image_url");
        assert_eq!(
            value["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(value["content"][1]["type"], "text");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, multimodal);
        assert_eq!(back.content.as_text(), "what is this?");
    }

    #[test]
    fn test_blank_reasoning_is_dropped() {
        let msg = Message::assistant("answer").with_reasoning("   ");
        assert!(msg.reasoning.is_none());
        let msg = Message::assistant("answer").with_reasoning("because");
        assert_eq!(msg.reasoning.as_deref(), Some("because"));
    }

    #[tokio::test]
    async fn test_collect_stream_splits_channels() {
        let stream: MessageChunkStream = Box::pin(futures_util::stream::iter(vec![
            chunk("", "think "),
            chunk("Hel", "more"),
            chunk("lo", ""),
        ]));
        let sink = Recorder {
            content: StdMutex::new(Vec::new()),
            reasoning: StdMutex::new(Vec::new()),
        };
        let response = collect_stream(stream, &sink).await.unwrap();
        assert_eq!(response.content, "Hello");
        assert_eq!(response.reasoning, "think more");
        assert_eq!(sink.content.lock().unwrap().len(), 2);
        assert_eq!(sink.reasoning.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collect_stream_keeps_partial_on_error() {
        let stream: MessageChunkStream = Box::pin(futures_util::stream::iter(vec![
            chunk("partial", ""),
            Err(ClientError::Stream("reset".into()).into()),
        ]));
        let response = collect_stream(stream, &NoopSink).await.unwrap();
        assert_eq!(response.content, "partial");

        let failing: MessageChunkStream = Box::pin(futures_util::stream::iter(vec![Err(
            ClientError::Stream("reset".into()).into(),
        )]));
        assert!(collect_stream(failing, &NoopSink).await.is_err());
    }
}
