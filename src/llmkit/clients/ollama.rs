//! [`ClientWrapper`] for a local Ollama daemon (`/api/chat`).
//!
//! Ollama takes plain-string message bodies; media parts are flattened to
//! their text. Streaming uses Ollama's newline-delimited JSON format.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::client_wrapper::{
    ChatOptions, ChatResponse, ClientError, ClientResult, ClientWrapper, Message, MessageChunk,
    MessageChunkStream, TokenUsage,
};
use crate::clients::common::{line_chunk_stream, post_json, LineEvent};
use crate::http_client_pool::get_or_create_client;

/// Default daemon address.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OllamaClient {
    pub fn new(model: &str) -> Self {
        Self::with_base_url(model, OLLAMA_BASE_URL)
    }

    pub fn with_base_url(model: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        OllamaClient {
            http: get_or_create_client(&base_url),
            base_url,
            model: model.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    fn body(&self, messages: &[Message], options: &ChatOptions, stream: bool) -> Value {
        let wire: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content.as_text()}))
            .collect();
        let mut opts = json!({});
        if let Some(t) = options.temperature {
            opts["temperature"] = json!(t);
        }
        if let Some(n) = options.max_tokens {
            opts["num_predict"] = json!(n);
        }
        if let Some(p) = options.top_p {
            opts["top_p"] = json!(p);
        }
        let mut body = json!({
            "model": self.model,
            "messages": wire,
            "stream": stream,
            "options": opts,
        });
        if options.json_mode {
            body["format"] = json!("json");
        }
        body
    }
}

/// Decode one NDJSON line of an Ollama chat stream.
pub fn parse_ndjson_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() {
        return LineEvent::Skip;
    }
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return LineEvent::Skip,
    };
    let message = value.get("message");
    let field = |key: &str| {
        message
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    LineEvent::Chunk(MessageChunk {
        content: field("content"),
        reasoning: field("thinking"),
        finish_reason: if done { Some("stop".to_string()) } else { None },
    })
}

#[async_trait]
impl ClientWrapper for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.body(messages, options, false);
        let response = post_json(&self.http, &url, &[], &body).await?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let message = json
            .get("message")
            .ok_or_else(|| ClientError::Decode("response has no message".into()))?;
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let reasoning = message
            .get("thinking")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let input = json.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0) as usize;
        let output = json.get("eval_count").and_then(Value::as_u64).unwrap_or(0) as usize;
        let usage = TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        };
        if let Ok(mut slot) = self.token_usage.lock() {
            *slot = Some(usage.clone());
        }

        Ok(ChatResponse {
            content,
            reasoning,
            usage: Some(usage),
        })
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<MessageChunkStream> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.body(messages, options, true);
        let response = post_json(&self.http, &url, &[], &body).await?;
        Ok(line_chunk_stream(response.bytes_stream(), parse_ndjson_line))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ContentPart, MessageContent};

    #[test]
    fn test_body_flattens_parts_and_maps_options() {
        let client = OllamaClient::new("translategemma");
        let msg = Message::user(MessageContent::Parts(vec![
            ContentPart::image_base64("image/png", "AA"),
            ContentPart::text("translate me"),
        ]));
        let body = client.body(
            &[msg],
            &ChatOptions::new().with_temperature(0.2).with_max_tokens(64),
            false,
        );
        assert_eq!(body["messages"][0]["content"], "translate me");
        assert_eq!(body["options"]["num_predict"], 64);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_ndjson_line() {
        match parse_ndjson_line(r#"{"message":{"role":"assistant","content":"Hola"},"done":false}"#) {
            LineEvent::Chunk(chunk) => {
                assert_eq!(chunk.content, "Hola");
                assert!(chunk.finish_reason.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_ndjson_line(r#"{"message":{"content":""},"done":true}"#) {
            LineEvent::Chunk(chunk) => assert_eq!(chunk.finish_reason.as_deref(), Some("stop")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parse_ndjson_line("garbage"), LineEvent::Skip);
    }
}
