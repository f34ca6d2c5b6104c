//! Streamed code review of a file, directory or remote repository.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::client_wrapper::{stream_chat, ChatOptions, ChatResponse, ClientWrapper, Message, StreamSink};

pub type ReviewResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const DEFAULT_REVIEW_OUTPUT: &str = "AI Review.md";

pub const REVIEW_SYSTEM_PROMPT: &str = "你是一位资深的代码审查专家。请对提供的代码进行全面审查，包括：

1. **代码质量**: 可读性、命名规范、代码结构
2. **潜在问题**: Bug、安全漏洞、性能问题
3. **最佳实践**: 是否遵循语言/框架的最佳实践
4. **改进建议**: 具体的优化方案和重构建议

请用 Markdown 格式输出审查报告，结构清晰，重点突出。";

/// Sampling used for reviews. Thinking is dropped by the client for non-hybrid models.
pub fn review_options() -> ChatOptions {
    ChatOptions::new()
        .with_max_tokens(131_072)
        .with_temperature(0.3)
        .with_top_p(0.95)
        .with_thinking(true)
}

pub fn build_review_request(code: &str) -> Vec<Message> {
    vec![
        Message::system(REVIEW_SYSTEM_PROMPT),
        Message::user(format!("请审查以下代码：\n\n{}", code)),
    ]
}

/// Report body: a reasoning `<details>` block first when any reasoning came back.
pub fn render_review_report(answer: &str, reasoning: &str) -> String {
    let mut out = String::new();
    let reasoning = reasoning.trim();
    if !reasoning.is_empty() {
        out.push_str("# AI 代码审查报告\n\n");
        out.push_str("<details>\n<summary>🧠 推理过程</summary>\n\n");
        out.push_str(reasoning);
        out.push_str("\n\n</details>\n\n");
        out.push_str("---\n\n");
    }
    out.push_str(answer);
    out
}

pub struct CodeReviewer {
    client: Arc<dyn ClientWrapper>,
    options: ChatOptions,
}

impl CodeReviewer {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            client,
            options: review_options(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Stream the review of `code`, forwarding deltas to `sink`.
    pub async fn review(&self, code: &str, sink: &dyn StreamSink) -> ReviewResult<ChatResponse> {
        log::info!(
            "CodeReviewer::review: {} chars with {}",
            code.chars().count(),
            self.client.model_name()
        );
        stream_chat(self.client.as_ref(), &build_review_request(code), &self.options, sink).await
    }

    /// Review and write the rendered report to `output`.
    pub async fn review_to_file(
        &self,
        code: &str,
        output: &Path,
        sink: &dyn StreamSink,
    ) -> ReviewResult<ChatResponse> {
        let response = self.review(code, sink).await?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, render_review_report(&response.content, &response.reasoning))?;
        log::info!("CodeReviewer::review_to_file: saved {}", output.display());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ClientResult, NoopSink};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct ReviewClient;

    #[async_trait]
    impl ClientWrapper for ReviewClient {
        fn model_name(&self) -> &str {
            "deepseek-ai/DeepSeek-V3.2"
        }

        async fn send_message(
            &self,
            messages: &[Message],
            options: &ChatOptions,
        ) -> ClientResult<ChatResponse> {
            assert_eq!(options.top_p, Some(0.95));
            assert!(messages[1].content.as_text().starts_with("请审查以下代码："));
            Ok(ChatResponse {
                content: "## 总结\n看起来不错".into(),
                reasoning: "  先看入口函数  ".into(),
                usage: None,
            })
        }
    }

    #[test]
    fn test_report_without_reasoning_is_answer_only() {
        assert_eq!(render_review_report("LGTM", "  \n"), "LGTM");
    }

    #[test]
    fn test_report_with_reasoning() {
        let report = render_review_report("LGTM", "thinking\n");
        assert!(report.starts_with("# AI 代码审查报告\n\n<details>\n<summary>🧠 推理过程</summary>\n\nthinking\n\n</details>\n\n---\n\nLGTM"));
    }

    #[tokio::test]
    async fn test_review_to_file() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("reports").join(DEFAULT_REVIEW_OUTPUT);
        let reviewer = CodeReviewer::new(Arc::new(ReviewClient));
        let response = reviewer
            .review_to_file("// main.rs\nfn main() {}", &output, &NoopSink)
            .await
            .unwrap();
        assert_eq!(response.content, "## 总结\n看起来不错");

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("先看入口函数\n\n</details>"));
        assert!(written.ends_with("看起来不错"));
    }
}
