//! Persistent multimodal chat.
//!
//! A [`Conversation`] owns the message history of one chat, streams each reply
//! and saves the whole history after every turn as a pretty JSON array in a
//! [`ConversationStore`]. The file name is fixed on the first turn from a
//! short model-generated title.

use base64::Engine;
use chrono::{DateTime, Local, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client_wrapper::{
    stream_chat, ChatOptions, ClientWrapper, ContentPart, InputAudio, Message, MessageContent,
    StreamSink,
};
use crate::store::JsonStore;

pub type ConversationResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Assistant text recorded when a reply could not be produced.
pub const RESPONSE_FAILED: &str = "响应生成失败";
pub const UNTITLED: &str = "未命名";
pub const MAX_TITLE_CHARS: usize = 15;

const TITLE_SYSTEM_PROMPT: &str = "你是一个对话命名助手，帮助提取对话关键词作为对话记录文件名，十五字以内。";
const TITLE_USER_PREFIX: &str = "提取对话的主题（仅输出主题本身）：";

lazy_static! {
    static ref TITLE_FORBIDDEN: Regex = Regex::new(r#"[\n\r\t\\/*?:"<>|]"#).unwrap();
}

/// Chat histories on disk, one `.json` file per conversation.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    store: JsonStore,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    /// Non-empty conversation files, newest first.
    pub fn list(&self) -> ConversationResult<Vec<String>> {
        self.store.list(true)
    }

    pub fn load(&self, filename: &str) -> ConversationResult<Vec<Message>> {
        self.store.read(filename)
    }

    pub fn save(&self, filename: &str, messages: &[Message]) -> ConversationResult<PathBuf> {
        self.store.write(filename, messages)
    }

    pub fn delete(&self, filename: &str) -> ConversationResult<()> {
        self.store.delete(filename)
    }
}

/// File-name-safe title of at most [`MAX_TITLE_CHARS`] characters.
pub fn sanitize_title(raw: &str) -> String {
    let flat = raw.trim().replace('\n', " ");
    TITLE_FORBIDDEN
        .replace_all(&flat, "")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// `<YYYYmmdd_HHMMSS>_<title>.json`, falling back to the untitled name.
pub fn conversation_filename<Tz: TimeZone>(now: &DateTime<Tz>, raw_title: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let title = sanitize_title(raw_title);
    let title = if title.is_empty() { UNTITLED.to_string() } else { title };
    format!("{}_{}.json", now.format("%Y%m%d_%H%M%S"), title)
}

/// Rewrite LaTeX delimiters for markdown renderers: `\(`/`\)` to `$`, `\[`/`\]` to `$$`.
pub fn normalize_latex(text: &str) -> String {
    text.replace(r"\\\\", r"\\")
        .replace(r"\(", "$")
        .replace(r"\)", "$")
        .replace(r"\[", "$$")
        .replace(r"\]", "$$")
}

/// Read an image or audio file as a message part.
pub fn attachment_from_file(path: &Path) -> ConversationResult<ContentPart> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let bytes = fs::read(path)?;
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    let part = match ext.as_str() {
        "png" => ContentPart::image_base64("image/png", &data),
        "jpg" | "jpeg" => ContentPart::image_base64("image/jpeg", &data),
        "webp" => ContentPart::image_base64("image/webp", &data),
        "gif" => ContentPart::image_base64("image/gif", &data),
        "mp3" | "wav" | "ogg" | "flac" | "m4a" => ContentPart::InputAudio {
            input_audio: InputAudio { data, format: ext },
        },
        _ => {
            return Err(format!("Unsupported attachment type: {}", path.display()).into());
        }
    };
    Ok(part)
}

/// Plain text without attachments, otherwise attachments then the text part.
pub fn build_user_message(text: &str, attachments: Vec<ContentPart>) -> Message {
    let text = text.trim();
    if attachments.is_empty() {
        return Message::user(text);
    }
    let mut parts = attachments;
    if !text.is_empty() {
        parts.push(ContentPart::text(text));
    }
    Message::user(MessageContent::Parts(parts))
}

/// Ask the model for a short title; empty on failure.
pub async fn generate_title(client: &dyn ClientWrapper, first_prompt: &str) -> String {
    let messages = [
        Message::system(TITLE_SYSTEM_PROMPT),
        Message::user(format!("{}{}", TITLE_USER_PREFIX, first_prompt)),
    ];
    match client.send_message(&messages, &ChatOptions::new()).await {
        Ok(response) => response.content.trim().to_string(),
        Err(err) => {
            log::warn!("generate_title: {}", err);
            String::new()
        }
    }
}

pub struct Conversation {
    client: Arc<dyn ClientWrapper>,
    title_client: Option<Arc<dyn ClientWrapper>>,
    store: ConversationStore,
    filename: Option<String>,
    messages: Vec<Message>,
    options: ChatOptions,
}

impl Conversation {
    pub fn new(client: Arc<dyn ClientWrapper>, store: ConversationStore) -> Self {
        Self {
            client,
            title_client: None,
            store,
            filename: None,
            messages: Vec::new(),
            options: ChatOptions::new().with_max_tokens(163_840),
        }
    }

    /// Resume a saved conversation.
    pub fn open(
        client: Arc<dyn ClientWrapper>,
        store: ConversationStore,
        filename: &str,
    ) -> ConversationResult<Self> {
        let messages = store.load(filename)?;
        let mut conversation = Self::new(client, store);
        conversation.messages = messages;
        conversation.filename = Some(filename.to_string());
        Ok(conversation)
    }

    /// Use a cheaper model for titles.
    pub fn with_title_client(mut self, client: Arc<dyn ClientWrapper>) -> Self {
        self.title_client = Some(client);
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// One turn: append the user message, stream the reply, name and save the chat.
    ///
    /// A failed reply is recorded as [`RESPONSE_FAILED`] with the error as its
    /// reasoning; only storage failures are returned as errors.
    pub async fn send(
        &mut self,
        text: &str,
        attachments: Vec<ContentPart>,
        sink: &dyn StreamSink,
    ) -> ConversationResult<Message> {
        self.messages.push(build_user_message(text, attachments));

        let reply = match stream_chat(self.client.as_ref(), &self.messages, &self.options, sink).await {
            Ok(response) => {
                let reasoning = response.reasoning.trim().to_string();
                Message::assistant(response.content).with_reasoning(reasoning)
            }
            Err(err) => {
                log::error!("Conversation::send: {}", err);
                Message::assistant(RESPONSE_FAILED).with_reasoning(format!("错误信息: {}", err))
            }
        };
        self.messages.push(reply.clone());

        if self.filename.is_none() {
            let client = self.title_client.as_ref().unwrap_or(&self.client);
            let title = generate_title(client.as_ref(), text.trim()).await;
            self.filename = Some(conversation_filename(&Local::now(), &title));
        }
        if let Some(filename) = &self.filename {
            self.store.save(filename, &self.messages)?;
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  Rust: 所有权/借用?\n规则  "), "Rust 所有权借用 规则");
        assert_eq!(sanitize_title("一二三四五六七八九十一二三四五六七"), "一二三四五六七八九十一二三四五");
        assert_eq!(sanitize_title("<>|*"), "");
    }

    #[test]
    fn test_conversation_filename() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(conversation_filename(&now, "量子计算"), "20250307_090501_量子计算.json");
        assert_eq!(conversation_filename(&now, "???"), "20250307_090501_未命名.json");
    }

    #[test]
    fn test_normalize_latex() {
        assert_eq!(normalize_latex(r"\(x^2\) and \[y\]"), "$x^2$ and $$y$$");
        assert_eq!(normalize_latex(r"a \\\\ b"), r"a \\ b");
    }

    #[test]
    fn test_build_user_message() {
        let plain = build_user_message(" hi ", Vec::new());
        assert_eq!(plain.content, MessageContent::Text("hi".into()));

        let image = ContentPart::image_base64("image/png", "AAAA");
        let multi = build_user_message("what?", vec![image.clone()]);
        assert_eq!(
            multi.content,
            MessageContent::Parts(vec![image, ContentPart::text("what?")])
        );
    }

    #[test]
    fn test_attachment_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png = tmp.path().join("a.PNG");
        fs::write(&png, [1u8, 2, 3]).unwrap();
        match attachment_from_file(&png).unwrap() {
            ContentPart::ImageUrl { image_url } => assert_eq!(image_url.url, "data:image/png;base64,AQID"),
            other => panic!("unexpected {:?}", other),
        }

        let wav = tmp.path().join("a.wav");
        fs::write(&wav, [0u8]).unwrap();
        match attachment_from_file(&wav).unwrap() {
            ContentPart::InputAudio { input_audio } => assert_eq!(input_audio.format, "wav"),
            other => panic!("unexpected {:?}", other),
        }

        let txt = tmp.path().join("a.txt");
        fs::write(&txt, "x").unwrap();
        assert!(attachment_from_file(&txt).is_err());
    }
}
