//! [`SearchProvider`] backed by the Exa API.
//!
//! `/search` returns hits with optional text and highlights, `/contents`
//! returns the full text of one URL. Requests authenticate with the
//! `x-api-key` header.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::http_client_pool::get_or_create_client;
use crate::search::{
    truncate_chars, PageContent, SearchError, SearchHit, SearchOptions, SearchProvider,
    SearchResult,
};

/// Production endpoint.
pub const EXA_BASE_URL: &str = "https://api.exa.ai";

/// Hit text is cut to this many characters.
const HIT_CONTENT_CHARS: usize = 2000;
/// Highlights kept per hit.
const MAX_HIGHLIGHTS: usize = 3;

pub struct ExaClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ExaClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, EXA_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        ExaClient {
            http: get_or_create_client(&base_url),
            api_key: api_key.to_string(),
            base_url,
        }
    }

    /// Whether a key is configured.
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn post(&self, path: &str, body: &Value) -> SearchResult<Value> {
        if !self.has_key() {
            return Err(Box::new(SearchError::MissingApiKey));
        }
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Box::new(SearchError::Api {
                status: status.as_u16(),
                body,
            }));
        }
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(value)
    }
}

/// Request body for `/search`.
pub fn search_body(query: &str, options: &SearchOptions) -> Value {
    let mut contents = json!({ "text": options.with_text });
    if let Some(n) = options.highlight_sentences {
        contents["highlights"] = json!({ "numSentences": n, "query": query });
    }
    let mut body = json!({
        "query": query,
        "useAutoprompt": options.use_autoprompt,
        "contents": contents,
    });
    if let Some(n) = options.num_results {
        body["numResults"] = json!(n);
    }
    if !options.include_domains.is_empty() {
        body["includeDomains"] = json!(options.include_domains);
    }
    body
}

/// Request body for `/contents`.
pub fn contents_body(url: &str, max_characters: usize) -> Value {
    json!({
        "ids": [url],
        "text": { "maxCharacters": max_characters, "includeHtmlTags": false },
    })
}

/// Decode the `results` array of a `/search` answer.
pub fn parse_search_response(value: &Value) -> Vec<SearchHit> {
    let results = match value.get("results").and_then(Value::as_array) {
        Some(r) => r,
        None => return Vec::new(),
    };
    results
        .iter()
        .map(|r| {
            let text = |key: &str| r.get(key).and_then(Value::as_str).unwrap_or_default();
            SearchHit {
                title: text("title").to_string(),
                url: text("url").to_string(),
                content: truncate_chars(text("text"), HIT_CONTENT_CHARS),
                highlights: r
                    .get("highlights")
                    .and_then(Value::as_array)
                    .map(|hs| {
                        hs.iter()
                            .filter_map(Value::as_str)
                            .take(MAX_HIGHLIGHTS)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                published_date: r
                    .get("publishedDate")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                score: r.get("score").and_then(Value::as_f64).unwrap_or(0.0),
            }
        })
        .collect()
}

#[async_trait]
impl SearchProvider for ExaClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>> {
        log::info!("ExaClient::search: {}", query);
        let value = self.post("/search", &search_body(query, options)).await?;
        let hits = parse_search_response(&value);
        log::debug!("ExaClient::search: {} hits for {}", hits.len(), query);
        Ok(hits)
    }

    async fn contents(&self, url: &str, max_characters: usize) -> SearchResult<PageContent> {
        log::info!("ExaClient::contents: {}", url);
        let value = self
            .post("/contents", &contents_body(url, max_characters))
            .await?;
        let text = value
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(|first| first.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::NoContent(url.to_string()))?;
        Ok(PageContent {
            url: url.to_string(),
            text: text.to_string(),
        })
    }
}
