//! Wire helpers shared by the chat clients: request body assembly, status
//! checking and line-oriented stream decoding (SSE and NDJSON).

use crate::client_wrapper::{
    ChatOptions, ChatResponse, ClientError, ClientResult, Message, MessageChunk,
    MessageChunkStream, MessageContent, Role, TokenUsage,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

/// Models that accept the `enable_thinking` switch.
pub const HYBRID_THINKING_MODELS: &[&str] = &[
    "deepseek-ai/DeepSeek-V3.1-Terminus",
    "Pro/deepseek-ai/DeepSeek-V3.1-Terminus",
    "deepseek-ai/DeepSeek-V3.2",
    "Pro/deepseek-ai/DeepSeek-V3.2",
    "zai-org/GLM-4.5V",
    "Qwen/Qwen3-VL-235B-A22B-Thinking",
];

/// Whether `model` understands `enable_thinking`.
pub fn supports_thinking(model: &str) -> bool {
    HYBRID_THINKING_MODELS.contains(&model) || model.contains("DeepSeek")
}

/// Provider view of a [`Message`]: the reasoning trace is never echoed back.
#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a MessageContent,
}

/// Assemble an OpenAI-style `/chat/completions` body.
pub fn build_chat_body(
    model: &str,
    messages: &[Message],
    options: &ChatOptions,
    stream: bool,
) -> Value {
    let wire: Vec<WireMessage<'_>> = messages
        .iter()
        .map(|m| WireMessage {
            role: m.role,
            content: &m.content,
        })
        .collect();

    let mut body = json!({
        "model": model,
        "messages": wire,
        "stream": stream,
    });

    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = options.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = options.top_p {
        body["top_p"] = json!(top_p);
    }
    if options.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    if let Some(enabled) = options.enable_thinking {
        if supports_thinking(model) {
            body["enable_thinking"] = json!(enabled);
        }
    }
    body
}

/// POST a JSON body, mapping transport failures and non-2xx statuses to [`ClientError`].
pub async fn post_json(
    http: &reqwest::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
) -> ClientResult<reqwest::Response> {
    let mut request = http.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("llmkit::clients::common::post_json({}): {} {}", url, status, body);
        return Err(ClientError::Api {
            status: status.as_u16(),
            body,
        }
        .into());
    }
    Ok(response)
}

/// Parse a non-streaming completion body.
pub fn parse_completion(body: &Value) -> ClientResult<ChatResponse> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ClientError::Decode("response has no choices[0].message".into()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let reasoning = message
        .get("reasoning_content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let usage = body.get("usage").map(|u| {
        let input = u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as usize;
        let output = u
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let total = u
            .get("total_tokens")
            .and_then(Value::as_u64)
            .map(|t| t as usize)
            .unwrap_or(input + output);
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: total,
        }
    });

    Ok(ChatResponse {
        content,
        reasoning,
        usage,
    })
}

/// Outcome of decoding one line of a streamed body.
#[derive(Debug, PartialEq)]
pub enum LineEvent {
    Chunk(MessageChunk),
    Done,
    Skip,
}

/// Decode one Server-Sent-Events line of an OpenAI-compatible stream.
///
/// `data: ` is optional, `[DONE]` terminates, blank or unparsable lines and
/// chunks without choices are skipped.
pub fn parse_sse_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return LineEvent::Skip;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line,
    };
    if payload == "[DONE]" {
        return LineEvent::Done;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => return LineEvent::Skip,
    };
    let choice = match value.get("choices").and_then(|c| c.get(0)) {
        Some(choice) => choice,
        None => return LineEvent::Skip,
    };
    let delta = choice.get("delta");
    let text_of = |key: &str| {
        delta
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    LineEvent::Chunk(MessageChunk {
        content: text_of("content"),
        reasoning: text_of("reasoning_content"),
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Splits a byte stream into lines, tolerating lines split across network reads.
#[derive(Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every completed line (without `\r\n`).
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string())
    }
}

struct LineStreamState<S> {
    inner: Pin<Box<S>>,
    buffer: LineBuffer,
    pending: VecDeque<MessageChunk>,
    parser: fn(&str) -> LineEvent,
    finished: bool,
}

/// Turn a raw body stream into [`MessageChunk`]s using a per-line decoder.
pub fn line_chunk_stream<S, B, E>(body: S, parser: fn(&str) -> LineEvent) -> MessageChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineStreamState {
        inner: Box::pin(body),
        buffer: LineBuffer::new(),
        pending: VecDeque::new(),
        parser,
        finished: false,
    };

    let stream = futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                return Some((Ok(chunk), st));
            }
            if st.finished {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(bytes)) => {
                    for line in st.buffer.push(bytes.as_ref()) {
                        match (st.parser)(&line) {
                            LineEvent::Chunk(chunk) => st.pending.push_back(chunk),
                            LineEvent::Done => {
                                st.finished = true;
                                break;
                            }
                            LineEvent::Skip => {}
                        }
                    }
                }
                Some(Err(err)) => {
                    st.finished = true;
                    let err: Box<dyn std::error::Error + Send + Sync> =
                        Box::new(ClientError::Stream(err.to_string()));
                    return Some((Err(err), st));
                }
                None => {
                    if let Some(line) = st.buffer.finish() {
                        if let LineEvent::Chunk(chunk) = (st.parser)(&line) {
                            st.pending.push_back(chunk);
                        }
                    }
                    st.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{collect_stream, NoopSink};

    #[test]
    fn test_thinking_flag_only_for_hybrid_models() {
        let opts = ChatOptions::new().with_thinking(true).with_json_mode();
        let body = build_chat_body("deepseek-ai/DeepSeek-V3.2", &[Message::user("q")], &opts, true);
        assert_eq!(body["enable_thinking"], json!(true));
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], json!(true));

        let body = build_chat_body("gemini-3-flash-preview", &[Message::user("q")], &opts, false);
        assert!(body.get("enable_thinking").is_none());
    }

    #[test]
    fn test_reasoning_never_sent_upstream() {
        let history = vec![Message::assistant("a").with_reasoning("secret")];
        let body = build_chat_body("m", &history, &ChatOptions::new(), false);
        assert!(body["messages"][0].get("reasoning").is_none());
        assert_eq!(body["messages"][0]["content"], "a");
        assert_eq!(body["messages"][0]["role"], "assistant");
    }

    #[test]
    fn test_parse_sse_line_variants() {
        assert_eq!(parse_sse_line(""), LineEvent::Skip);
        assert_eq!(parse_sse_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(parse_sse_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(parse_sse_line("data: {not json"), LineEvent::Skip);
        assert_eq!(parse_sse_line(r#"data: {"choices": []}"#), LineEvent::Skip);

        match parse_sse_line(
            r#"data: {"choices":[{"delta":{"content":"Hi","reasoning_content":"hmm"},"finish_reason":null}]}"#,
        ) {
            LineEvent::Chunk(chunk) => {
                assert_eq!(chunk.content, "Hi");
                assert_eq!(chunk.reasoning, "hmm");
                assert!(chunk.finish_reason.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_completion_reads_usage_and_reasoning() {
        let body = json!({
            "choices": [{"message": {"content": "ok", "reasoning_content": "r"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        });
        let response = parse_completion(&body).unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.reasoning, "r");
        assert_eq!(response.usage.unwrap().total_tokens, 7);

        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_line_buffer_handles_split_reads() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        assert_eq!(buffer.push(b":1}\r\ndata: x\n"), vec!["data: {\"a\":1}", "data: x"]);
        assert_eq!(buffer.push(b"tail").len(), 0);
        assert_eq!(buffer.finish().as_deref(), Some("tail"));
        assert!(buffer.finish().is_none());
    }

    #[tokio::test]
    async fn test_sse_stream_stops_at_done() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi".to_vec()),
            Ok(b"ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n".to_vec()),
            Ok(b"data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n".to_vec()),
        ];
        let stream = line_chunk_stream(futures_util::stream::iter(parts), parse_sse_line);
        let response = collect_stream(stream, &NoopSink).await.unwrap();
        assert_eq!(response.content, "Hello");
    }
}
