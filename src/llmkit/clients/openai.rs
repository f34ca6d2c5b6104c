//! The `OpenAICompatibleClient` implements [`ClientWrapper`] for any endpoint
//! that speaks the OpenAI Chat Completions dialect (SiliconFlow, Gemini's
//! OpenAI bridge, vLLM, ...), including the `reasoning_content` channel of
//! thinking models.
//!
//! # Example
//!
//! ```rust,no_run
//! use llmkit::clients::openai::OpenAICompatibleClient;
//! use llmkit::client_wrapper::{ChatOptions, ClientWrapper, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let key = std::env::var("SILICONFLOW_API_KEY").expect("SILICONFLOW_API_KEY not set");
//!     let client = OpenAICompatibleClient::siliconflow(&key, "deepseek-ai/DeepSeek-V3.2");
//!
//!     let resp = client
//!         .send_message(&[Message::user("Hello!")], &ChatOptions::new())
//!         .await
//!         .unwrap();
//!     println!("Assistant: {}", resp.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens: {} in / {} out", usage.input_tokens, usage.output_tokens);
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::client_wrapper::{
    ChatOptions, ChatResponse, ClientError, ClientResult, ClientWrapper, Message,
    MessageChunkStream, TokenUsage,
};
use crate::clients::common::{
    build_chat_body, line_chunk_stream, parse_completion, parse_sse_line, post_json,
};
use crate::http_client_pool::get_or_create_client;

/// SiliconFlow's OpenAI-compatible base URL.
pub const SILICONFLOW_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Google's OpenAI-compatible Gemini bridge.
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Client wrapper for OpenAI-compatible Chat Completions APIs.
///
/// Holds the pooled HTTP client for its base URL, the bearer key, the model
/// name injected into each request, and the usage of the last blocking call.
pub struct OpenAICompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAICompatibleClient {
    /// Construct a client for an arbitrary base URL (with or without trailing slash).
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        OpenAICompatibleClient {
            http: get_or_create_client(&base_url),
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// SiliconFlow preset.
    pub fn siliconflow(api_key: &str, model: &str) -> Self {
        Self::new(api_key, model, SILICONFLOW_BASE_URL)
    }

    /// Gemini preset (OpenAI-compatible bridge).
    pub fn gemini(api_key: &str, model: &str) -> Self {
        Self::new(api_key, model, GEMINI_OPENAI_BASE_URL)
    }

    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn auth_headers(&self) -> ClientResult<Vec<(&'static str, String)>> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::MissingApiKey("the provider API key".into()).into());
        }
        Ok(vec![("Authorization", format!("Bearer {}", self.api_key))])
    }
}

#[async_trait]
impl ClientWrapper for OpenAICompatibleClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<ChatResponse> {
        let headers = self.auth_headers()?;
        let body = build_chat_body(&self.model, messages, options, false);

        let response = post_json(&self.http, &self.endpoint(), &headers, &body).await?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let parsed = parse_completion(&json)?;

        if let Ok(mut slot) = self.token_usage.lock() {
            *slot = parsed.usage.clone();
        }
        Ok(parsed)
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<MessageChunkStream> {
        let headers = self.auth_headers()?;
        let body = build_chat_body(&self.model, messages, options, true);

        let response = post_json(&self.http, &self.endpoint(), &headers, &body).await?;
        log::debug!(
            "OpenAICompatibleClient::send_message_stream: streaming from {}",
            self.model
        );
        Ok(line_chunk_stream(response.bytes_stream(), parse_sse_line))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalises_trailing_slash() {
        let client = OpenAICompatibleClient::new("k", "m", "https://example.com/v1/");
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
        assert_eq!(client.model_name(), "m");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = OpenAICompatibleClient::siliconflow("", "deepseek-ai/DeepSeek-V3.2");
        let err = client
            .send_message(&[Message::user("hi")], &ChatOptions::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing API key"));
        assert!(client.get_last_usage().is_none());
    }
}
