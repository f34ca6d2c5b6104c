//! AI news fetchers: Hugging Face daily papers, Hacker News and arXiv.
//!
//! Every fetcher swallows its own failures (logged, empty list) so one dead
//! source never blocks a digest. Hacker News and arXiv entries are kept only
//! when their title mentions one of the keywords, case-insensitively.

use futures_util::stream::{self, StreamExt};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;

use crate::http_client_pool::get_or_create_client;

pub type NewsResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const DEFAULT_KEYWORDS: [&str; 11] = [
    "LLM", "Transformer", "GPT", "Claude", "Gemini", "DeepSeek", "RAG", "Agent", "Diffusion",
    "Quantization", "MoE",
];

pub const HACKER_NEWS_API: &str = "https://hacker-news.firebaseio.com/v0";
pub const ARXIV_QUERY_URL: &str = "http://export.arxiv.org/api/query?search_query=cat:cs.CL&start=0&max_results=10&sortBy=submittedDate&sortOrder=descending";
pub const HF_DAILY_PAPERS_URL: &str = "https://huggingface.co/api/daily_papers";

const HN_TOP_LIMIT: usize = 50;
const HN_CONCURRENCY: usize = 8;
const HF_LIMIT: usize = 8;
const ARXIV_SUMMARY_CHARS: usize = 150;
const HF_SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub source: String,
    pub title: String,
    pub url: String,
    /// Short extra line: score, votes or abstract head.
    pub desc: String,
}

pub fn matches_keywords(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(&k.to_lowercase()))
}

/// A Hacker News item JSON, if titled and on-topic.
pub fn hn_item_to_news(id: u64, item: &Value, keywords: &[String]) -> Option<NewsItem> {
    let title = item.get("title")?.as_str()?;
    if !matches_keywords(title, keywords) {
        return None;
    }
    let url = item
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", id));
    Some(NewsItem {
        source: "Hacker News".to_string(),
        title: title.to_string(),
        url,
        desc: format!("Score: {}", item.get("score").and_then(Value::as_i64).unwrap_or(0)),
    })
}

#[derive(Clone, Copy, PartialEq)]
enum AtomField {
    None,
    Title,
    Summary,
    Id,
}

#[derive(Default)]
struct AtomEntry {
    title: String,
    summary: String,
    id: String,
    link: Option<String>,
}

/// On-topic entries of an arXiv Atom feed.
pub fn parse_arxiv_feed(xml: &str, keywords: &[String]) -> Vec<NewsItem> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<AtomEntry> = None;
    let mut field = AtomField::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"entry" => current = Some(AtomEntry::default()),
                b"title" if current.is_some() => field = AtomField::Title,
                b"summary" if current.is_some() => field = AtomField::Summary,
                b"id" if current.is_some() => field = AtomField::Id,
                b"link" => {
                    if let Some(entry) = current.as_mut() {
                        read_alternate_link(&e, entry);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"link" {
                    if let Some(entry) = current.as_mut() {
                        read_alternate_link(&e, entry);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Ok(text)) = (current.as_mut(), t.unescape()) {
                    match field {
                        AtomField::Title => entry.title.push_str(&text),
                        AtomField::Summary => entry.summary.push_str(&text),
                        AtomField::Id => entry.id.push_str(&text),
                        AtomField::None => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                field = AtomField::None;
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                log::warn!("parse_arxiv_feed: malformed feed: {}", err);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    entries
        .into_iter()
        .filter(|entry| matches_keywords(&entry.title, keywords))
        .map(|entry| {
            let summary = entry.summary.trim();
            let head: String = summary.chars().take(ARXIV_SUMMARY_CHARS).collect();
            NewsItem {
                source: "ArXiv".to_string(),
                title: entry.title.trim().replace('\n', " "),
                url: { let id = &entry.id; entry.link.unwrap_or_else(|| id.trim().to_string()) },
                desc: format!("{}...", head),
            }
        })
        .collect()
}

fn read_alternate_link(e: &quick_xml::events::BytesStart, entry: &mut AtomEntry) {
    let mut href = None;
    let mut alternate = true;
    for attr in e.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => continue,
        };
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => alternate = value == "alternate",
            _ => {}
        }
    }
    if alternate && entry.link.is_none() {
        entry.link = href;
    }
}

/// The first eight Hugging Face daily papers.
pub fn parse_hf_daily(value: &Value) -> Vec<NewsItem> {
    let items = match value.as_array() {
        Some(items) => items,
        None => return Vec::new(),
    };
    items
        .iter()
        .take(HF_LIMIT)
        .filter_map(|item| {
            let paper = item.get("paper")?;
            let title = paper.get("title")?.as_str()?;
            let id = paper.get("id")?.as_str()?;
            let summary = paper
                .get("summary")
                .and_then(Value::as_str)
                .map(|s| s.chars().take(HF_SUMMARY_CHARS).collect::<String>())
                .unwrap_or_else(|| "No summary".to_string());
            Some(NewsItem {
                source: "Hugging Face".to_string(),
                title: title.to_string(),
                url: format!("https://huggingface.co/papers/{}", id),
                desc: format!(
                    "Votes: {} | {}",
                    item.get("numComments").and_then(Value::as_i64).unwrap_or(0),
                    summary
                ),
            })
        })
        .collect()
}

/// Fetches the three sources.
pub struct NewsFetcher {
    keywords: Vec<String>,
    hn_api: String,
    arxiv_url: String,
    hf_url: String,
}

impl Default for NewsFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsFetcher {
    pub fn new() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            hn_api: HACKER_NEWS_API.to_string(),
            arxiv_url: ARXIV_QUERY_URL.to_string(),
            hf_url: HF_DAILY_PAPERS_URL.to_string(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    async fn get_json(url: &str) -> NewsResult<Value> {
        let response = get_or_create_client(url_origin(url)).get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn try_hackernews(&self) -> NewsResult<Vec<NewsItem>> {
        let top = Self::get_json(&format!("{}/topstories.json", self.hn_api)).await?;
        let ids: Vec<u64> = top
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_u64).take(HN_TOP_LIMIT).collect())
            .unwrap_or_default();

        let items: Vec<Option<NewsItem>> = stream::iter(ids)
            .map(|id| async move {
                match Self::get_json(&format!("{}/item/{}.json", self.hn_api, id)).await {
                    Ok(item) => hn_item_to_news(id, &item, &self.keywords),
                    Err(err) => {
                        log::debug!("fetch_hackernews: item {} failed: {}", id, err);
                        None
                    }
                }
            })
            .buffered(HN_CONCURRENCY)
            .collect()
            .await;
        Ok(items.into_iter().flatten().collect())
    }

    async fn try_arxiv(&self) -> NewsResult<Vec<NewsItem>> {
        let response = get_or_create_client(url_origin(&self.arxiv_url))
            .get(&self.arxiv_url)
            .send()
            .await?
            .error_for_status()?;
        let xml = response.text().await?;
        Ok(parse_arxiv_feed(&xml, &self.keywords))
    }

    async fn try_huggingface(&self) -> NewsResult<Vec<NewsItem>> {
        let value = Self::get_json(&self.hf_url).await?;
        Ok(parse_hf_daily(&value))
    }

    pub async fn fetch_hackernews(&self) -> Vec<NewsItem> {
        log::info!("Fetching Hacker News...");
        self.try_hackernews().await.unwrap_or_else(|err| {
            log::error!("Hacker News fetch failed: {}", err);
            Vec::new()
        })
    }

    pub async fn fetch_arxiv(&self) -> Vec<NewsItem> {
        log::info!("Fetching ArXiv (cs.CL)...");
        self.try_arxiv().await.unwrap_or_else(|err| {
            log::error!("ArXiv fetch failed: {}", err);
            Vec::new()
        })
    }

    pub async fn fetch_huggingface(&self) -> Vec<NewsItem> {
        log::info!("Fetching Hugging Face Daily Papers...");
        self.try_huggingface().await.unwrap_or_else(|err| {
            log::error!("Hugging Face fetch failed: {}", err);
            Vec::new()
        })
    }

    /// Hugging Face first, then Hacker News, then arXiv.
    pub async fn fetch_all(&self) -> Vec<NewsItem> {
        let mut items = self.fetch_huggingface().await;
        items.extend(self.fetch_hackernews().await);
        items.extend(self.fetch_arxiv().await);
        items
    }
}

/// `scheme://host[:port]` of a URL, used as the pool key.
fn url_origin(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}
