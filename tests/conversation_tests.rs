use async_trait::async_trait;
use futures_util::stream;
use llmkit::client_wrapper::{
    ChatOptions, ChatResponse, ClientError, ClientResult, ClientWrapper, ContentPart, Message,
    MessageChunk, MessageChunkStream, MessageContent, NoopSink, Role, StreamSink,
};
use llmkit::conversation::{Conversation, ConversationStore, RESPONSE_FAILED};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Streams its reply in two chunks: reasoning, then content.
struct StreamingMockClient {
    reply: String,
    fail: bool,
    history_lengths: Mutex<Vec<usize>>,
}

impl StreamingMockClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            history_lengths: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClientWrapper for StreamingMockClient {
    fn model_name(&self) -> &str {
        "mock-stream"
    }

    async fn send_message(&self, _: &[Message], _: &ChatOptions) -> ClientResult<ChatResponse> {
        unreachable!("chat always streams")
    }

    async fn send_message_stream(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<MessageChunkStream> {
        assert_eq!(options.max_tokens, Some(163_840));
        self.history_lengths.lock().unwrap().push(messages.len());
        if self.fail {
            return Err(Box::new(ClientError::Api {
                status: 429,
                body: "rate limited".into(),
            }));
        }
        let chunks: Vec<ClientResult<MessageChunk>> = vec![
            Ok(MessageChunk {
                reasoning: "  pondering  ".into(),
                ..Default::default()
            }),
            Ok(MessageChunk {
                content: self.reply.clone(),
                finish_reason: Some("stop".into()),
                ..Default::default()
            }),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Title generator with a fixed answer.
struct TitleClient {
    title: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl ClientWrapper for TitleClient {
    fn model_name(&self) -> &str {
        "mock-title"
    }

    async fn send_message(&self, messages: &[Message], _: &ChatOptions) -> ClientResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(messages[1].content.as_text().starts_with("提取对话的主题（仅输出主题本身）："));
        match &self.title {
            Some(title) => Ok(ChatResponse {
                content: title.clone(),
                ..Default::default()
            }),
            None => Err(Box::new(ClientError::Transport("down".into()))),
        }
    }
}

#[derive(Default)]
struct Captured {
    content: Mutex<String>,
    reasoning: Mutex<String>,
}

impl StreamSink for Captured {
    fn on_content(&self, delta: &str) {
        self.content.lock().unwrap().push_str(delta);
    }

    fn on_reasoning(&self, delta: &str) {
        self.reasoning.lock().unwrap().push_str(delta);
    }
}

#[tokio::test]
async fn test_first_turn_names_and_saves_the_conversation() {
    let tmp = TempDir::new().unwrap();
    let store = ConversationStore::new(tmp.path().join("ChatHistory"));
    let title = Arc::new(TitleClient {
        title: Some("Rust: 生命周期/借用\n检查器详解".into()),
        calls: AtomicUsize::new(0),
    });
    let mut chat = Conversation::new(Arc::new(StreamingMockClient::new("Hello!")), store.clone())
        .with_title_client(title.clone());

    let sink = Captured::default();
    let reply = chat.send("讲讲生命周期", Vec::new(), &sink).await.unwrap();

    assert_eq!(reply.content.as_text(), "Hello!");
    assert_eq!(reply.reasoning.as_deref(), Some("pondering"));
    assert_eq!(*sink.content.lock().unwrap(), "Hello!");
    assert_eq!(*sink.reasoning.lock().unwrap(), "  pondering  ");

    let filename = chat.filename().unwrap().to_string();
    assert!(filename.ends_with("_Rust 生命周期借用 检查器.json"), "{}", filename);
    assert_eq!(store.list().unwrap(), vec![filename.clone()]);

    let saved = store.load(&filename).unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].role, Role::User);
    assert_eq!(saved[1].reasoning.as_deref(), Some("pondering"));

    // second turn keeps the name and does not ask for a title again
    chat.send("继续", Vec::new(), &NoopSink).await.unwrap();
    assert_eq!(chat.filename(), Some(filename.as_str()));
    assert_eq!(title.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.load(&filename).unwrap().len(), 4);
}

#[tokio::test]
async fn test_failed_reply_is_recorded_and_untitled_fallback() {
    let tmp = TempDir::new().unwrap();
    let store = ConversationStore::new(tmp.path());
    let mut client = StreamingMockClient::new("");
    client.fail = true;
    let mut chat = Conversation::new(Arc::new(client), store.clone()).with_title_client(Arc::new(TitleClient {
        title: None,
        calls: AtomicUsize::new(0),
    }));

    let reply = chat.send("hi", Vec::new(), &NoopSink).await.unwrap();
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content.as_text(), RESPONSE_FAILED);
    assert!(reply.reasoning.unwrap().starts_with("错误信息: "));
    assert!(chat.filename().unwrap().ends_with("_未命名.json"));
}

#[tokio::test]
async fn test_resume_appends_to_saved_history() {
    let tmp = TempDir::new().unwrap();
    let store = ConversationStore::new(tmp.path());
    store
        .save(
            "20250101_120000_旧对话.json",
            &[Message::user("old question"), Message::assistant("old answer")],
        )
        .unwrap();

    let client = Arc::new(StreamingMockClient::new("new answer"));
    let mut chat = Conversation::open(client.clone(), store.clone(), "20250101_120000_旧对话.json").unwrap();
    assert_eq!(chat.messages().len(), 2);

    let image = ContentPart::image_base64("image/png", "AAAA");
    chat.send("what is this?", vec![image.clone()], &NoopSink).await.unwrap();

    assert_eq!(client.history_lengths.lock().unwrap().as_slice(), &[3]);
    let saved = store.load("20250101_120000_旧对话.json").unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(
        saved[2].content,
        MessageContent::Parts(vec![image, ContentPart::text("what is this?")])
    );

    store.delete("20250101_120000_旧对话.json").unwrap();
    assert!(store.list().unwrap().is_empty());
}
