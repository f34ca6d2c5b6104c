//! Semantic web search.
//!
//! [`SearchProvider`] is the seam between the agents and a search backend;
//! [`exa::ExaClient`] is the production implementation. The helpers in this
//! module turn results into the plain-text observations fed back to a model.

pub mod exa;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Result alias for search operations.
pub type SearchResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Page text above this many characters is cut when shown to a model.
pub const DEFAULT_PAGE_CHAR_LIMIT: usize = 40_000;

/// Errors raised by search providers.
#[derive(Debug, Clone)]
pub enum SearchError {
    /// No key configured for the provider.
    MissingApiKey,
    /// Non-2xx answer from the provider.
    Api { status: u16, body: String },
    /// Network failure.
    Transport(String),
    /// Unexpected response shape.
    Decode(String),
    /// The provider returned nothing for a content request.
    NoContent(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::MissingApiKey => write!(f, "EXA_API_KEY not set"),
            SearchError::Api { status, body } => write!(f, "search API error {}: {}", status, body),
            SearchError::Transport(msg) => write!(f, "search transport error: {}", msg),
            SearchError::Decode(msg) => write!(f, "search decode error: {}", msg),
            SearchError::NoContent(url) => write!(f, "no content retrieved for {}", url),
        }
    }
}

impl Error for SearchError {}

/// One search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Page text, at most 2000 characters; empty when text was not requested.
    #[serde(default)]
    pub content: String,
    /// At most three highlight sentences.
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub score: f64,
}

/// Knobs for a search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// `None` leaves the provider default.
    pub num_results: Option<usize>,
    pub include_domains: Vec<String>,
    /// Fetch page text along with the hits.
    pub with_text: bool,
    /// Ask for this many query-relevant highlight sentences per hit.
    pub highlight_sentences: Option<usize>,
    pub use_autoprompt: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num_results: None,
            include_domains: Vec::new(),
            with_text: true,
            highlight_sentences: None,
            use_autoprompt: false,
        }
    }
}

impl SearchOptions {
    /// Agent-style lookup: few hits, highlights only, no full text.
    pub fn for_agent() -> Self {
        Self {
            num_results: Some(3),
            include_domains: Vec::new(),
            with_text: false,
            highlight_sentences: Some(3),
            use_autoprompt: true,
        }
    }

    /// Research-style lookup: full text restricted to `domains`.
    pub fn for_research(domains: &[String]) -> Self {
        Self {
            include_domains: domains.to_vec(),
            ..Self::default()
        }
    }
}

/// Full text of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub url: String,
    pub text: String,
}

/// A search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query.
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>>;

    /// Retrieve up to `max_characters` of a page's text.
    async fn contents(&self, url: &str, max_characters: usize) -> SearchResult<PageContent>;
}

lazy_static! {
    static ref BLANK_RUNS: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// Collapse runs of blank lines into a single blank line.
pub fn clean_page_text(text: &str) -> String {
    BLANK_RUNS.replace_all(text, "\n\n").into_owned()
}

/// Observation text for a list of hits.
pub fn format_hits_for_observation(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    let mut obs = format!(
        "Found {} pages. If you need details, use 'visit' action on a URL.\n\n",
        hits.len()
    );
    for (i, hit) in hits.iter().enumerate() {
        let snippet = if hit.highlights.is_empty() {
            "No highlights.".to_string()
        } else {
            hit.highlights.join(" ... ")
        };
        obs.push_str(&format!(
            "[{}] Title: {}\n    URL: {}\n    Highlights: {}\n\n",
            i + 1,
            hit.title,
            hit.url,
            snippet
        ));
    }
    obs
}

/// Observation text for a fetched page, cut at `limit` characters.
pub fn format_page_observation(url: &str, text: &str, limit: usize) -> String {
    let cleaned = clean_page_text(text);
    let len = cleaned.chars().count();
    log::info!("format_page_observation: retrieved {} characters from {}", len, url);

    if len > limit {
        let truncated: String = cleaned.chars().take(limit).collect();
        format!(
            "--- Content of {} (Truncated at {}k chars) ---\n{}\n--- End of Content ---",
            url,
            limit / 1000,
            truncated
        )
    } else {
        format!(
            "--- Full Content of {} ---\n{}\n--- End of Content ---",
            url, cleaned
        )
    }
}

/// Truncate to `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, highlights: &[&str]) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: format!("https://example.com/{}", title),
            highlights: highlights.iter().map(|s| s.to_string()).collect(),
            ..SearchHit::default()
        }
    }

    #[test]
    fn test_observation_for_hits() {
        assert_eq!(format_hits_for_observation(&[]), "No results found.");

        let obs = format_hits_for_observation(&[hit("a", &["x", "y"]), hit("b", &[])]);
        assert!(obs.starts_with("Found 2 pages."));
        assert!(obs.contains("[1] Title: a\n    URL: https://example.com/a\n    Highlights: x ... y"));
        assert!(obs.contains("[2] Title: b"));
        assert!(obs.contains("Highlights: No highlights."));
    }

    #[test]
    fn test_clean_page_text_collapses_blank_runs() {
        assert_eq!(clean_page_text("a\n\n\n  \nb\nc"), "a\n\nb\nc");
    }

    #[test]
    fn test_page_observation_truncates() {
        let short = format_page_observation("u", "hello", 40_000);
        assert!(short.starts_with("--- Full Content of u ---\nhello"));

        let long = "z".repeat(50);
        let obs = format_page_observation("u", &long, 10);
        assert!(obs.contains("(Truncated at 0k chars)"));
        assert!(obs.contains(&"z".repeat(10)));
        assert!(!obs.contains(&"z".repeat(11)));
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("研究助手", 2), "研究");
    }
}
