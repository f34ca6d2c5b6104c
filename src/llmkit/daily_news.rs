//! AI daily digest: fetch news, let the model curate it, save a dated report.

use chrono::NaiveDate;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client_wrapper::{stream_chat, ChatOptions, ClientWrapper, Message, StreamSink};
use crate::tools::news::{NewsFetcher, NewsItem};

pub type DigestResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Report body used when the model call fails.
pub const SUMMARY_FAILED: &str = "AI 总结失败，请检查 API Key 或网络连接。";

/// `idx. [source] title / Link / Info` blocks, numbered from 1.
pub fn format_news_context(items: &[NewsItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. [{}] {}\n   Link: {}\n   Info: {}\n\n",
                i + 1,
                item.source,
                item.title,
                item.url,
                item.desc
            )
        })
        .collect()
}

pub fn build_digest_prompt(items: &[NewsItem]) -> String {
    format!(
        "你是一位极其专业、眼光独到的 AI 技术日报主编。
请阅读以下今天抓取到的原始 AI 资讯/论文列表：

{}

请完成以下任务，生成一份高质量的 Markdown 日报：

1. **筛选与去重**：从列表中挑选出最重要、最具技术价值的 5-8 条新闻/论文。忽略同质化严重或无意义的内容。
2. **中文深度点评**：
   - 将标题翻译为中文。
   - 为每一条写一段简短但深刻的点评（2-3句话）。不要只复述摘要，要指出它的技术创新点、解决了什么问题，或者对行业意味着什么。
3. **分类展示**：请按以下类别分类：
   - 🔥 **重磅头条** (Must Read)
   - 📝 **硬核论文** (Research)
   - 🛠️ **开源/工具** (Engineering)
4. **格式要求**：使用 Markdown 格式，包含原文链接。

输出风格要干练、极客，拒绝废话。",
        format_news_context(items)
    )
}

pub fn report_filename(date: NaiveDate) -> String {
    format!("AI_Daily_Report_{}.md", date.format("%Y-%m-%d"))
}

pub fn render_report(date: NaiveDate, model: &str, body: &str, item_count: usize) -> String {
    format!(
        "# 🤖 AI 每日深度简报 ({})\n\n> 由 {} 自动生成\n\n{}\n\n---\n### 🔗 原始资讯数据源\n共抓取 {} 条原始数据，精选如上。",
        date.format("%Y-%m-%d"),
        model,
        body,
        item_count
    )
}

pub struct DailyDigest {
    client: Arc<dyn ClientWrapper>,
    fetcher: NewsFetcher,
    output_dir: PathBuf,
}

impl DailyDigest {
    pub fn new(client: Arc<dyn ClientWrapper>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            fetcher: NewsFetcher::new(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: NewsFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Curate `items` with the model; a failed call yields [`SUMMARY_FAILED`].
    pub async fn summarize(&self, items: &[NewsItem], sink: &dyn StreamSink) -> String {
        let options = ChatOptions::new()
            .with_max_tokens(163_840)
            .with_temperature(0.5)
            .with_thinking(true);
        let messages = [Message::user(build_digest_prompt(items))];
        match stream_chat(self.client.as_ref(), &messages, &options, sink).await {
            Ok(response) => response.content,
            Err(err) => {
                log::error!("DailyDigest::summarize: {}", err);
                SUMMARY_FAILED.to_string()
            }
        }
    }

    /// Write the report for `items` dated `date`.
    pub async fn build_report(
        &self,
        items: &[NewsItem],
        date: NaiveDate,
        sink: &dyn StreamSink,
    ) -> DigestResult<PathBuf> {
        let body = self.summarize(items, sink).await;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(report_filename(date));
        fs::write(&path, render_report(date, self.client.model_name(), &body, items.len()))?;
        log::info!("DailyDigest::build_report: saved {}", path.display());
        Ok(path)
    }

    /// Fetch every source and write the report. `None` when nothing was fetched.
    pub async fn run(&self, date: NaiveDate, sink: &dyn StreamSink) -> DigestResult<Option<PathBuf>> {
        let items = self.fetcher.fetch_all().await;
        if items.is_empty() {
            log::info!("DailyDigest::run: no news today");
            return Ok(None);
        }
        self.build_report(&items, date, sink).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ChatResponse, ClientError, ClientResult, NoopSink};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct DigestClient {
        fail: bool,
    }

    #[async_trait]
    impl ClientWrapper for DigestClient {
        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn send_message(&self, _: &[Message], _: &ChatOptions) -> ClientResult<ChatResponse> {
            if self.fail {
                return Err(Box::new(ClientError::Transport("offline".into())));
            }
            Ok(ChatResponse {
                content: "## 🔥 重磅头条".into(),
                ..Default::default()
            })
        }
    }

    fn items() -> Vec<NewsItem> {
        vec![
            NewsItem {
                source: "Hugging Face".into(),
                title: "Paper A".into(),
                url: "https://huggingface.co/papers/1".into(),
                desc: "Votes: 3 | abc".into(),
            },
            NewsItem {
                source: "Hacker News".into(),
                title: "GPT news".into(),
                url: "https://x.y".into(),
                desc: "Score: 10".into(),
            },
        ]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_news_context_numbering() {
        let context = format_news_context(&items());
        assert!(context.starts_with(
            "1. [Hugging Face] Paper A\n   Link: https://huggingface.co/papers/1\n   Info: Votes: 3 | abc\n\n"
        ));
        assert!(context.contains("2. [Hacker News] GPT news"));
        assert!(build_digest_prompt(&items()).contains(&context));
    }

    #[test]
    fn test_report_layout() {
        assert_eq!(report_filename(date()), "AI_Daily_Report_2025-03-07.md");
        let report = render_report(date(), "m", "body", 12);
        assert!(report.starts_with("# 🤖 AI 每日深度简报 (2025-03-07)\n\n> 由 m 自动生成\n\nbody\n\n---\n"));
        assert!(report.ends_with("共抓取 12 条原始数据，精选如上。"));
    }

    #[tokio::test]
    async fn test_build_report_writes_file() {
        let tmp = TempDir::new().unwrap();
        let digest = DailyDigest::new(Arc::new(DigestClient { fail: false }), tmp.path().join("DailyNews"));
        let path = digest.build_report(&items(), date(), &NoopSink).await.unwrap();
        assert!(path.ends_with("AI_Daily_Report_2025-03-07.md"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("> 由 test-model 自动生成"));
        assert!(text.contains("## 🔥 重磅头条"));
    }

    #[tokio::test]
    async fn test_failed_summary_still_writes_report() {
        let tmp = TempDir::new().unwrap();
        let digest = DailyDigest::new(Arc::new(DigestClient { fail: true }), tmp.path());
        let path = digest.build_report(&items(), date(), &NoopSink).await.unwrap();
        assert!(fs::read_to_string(path).unwrap().contains(SUMMARY_FAILED));
    }
}
