//! Concrete [`ToolProtocol`] implementations.
//!
//! [`WebResearchProtocol`] gives an agent two tools over any
//! [`SearchProvider`]:
//!
//! - `search`: find pages, returning titles, URLs and highlight sentences;
//! - `visit`: read up to 40,000 characters of one page.
//!
//! Provider failures come back as failed [`ToolResult`]s whose error text is
//! a readable observation, so an agent loop keeps going.
//!
//! ```rust,no_run
//! use llmkit::search::exa::ExaClient;
//! use llmkit::tool_protocol::ToolRegistry;
//! use llmkit::tool_protocols::WebResearchProtocol;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let exa = Arc::new(ExaClient::new(&std::env::var("EXA_API_KEY")?));
//! let registry = ToolRegistry::from_protocol(Arc::new(WebResearchProtocol::new(exa))).await?;
//! let result = registry.execute_with_input("search", "DeepSeek-V3.2 math benchmarks").await?;
//! println!("{}", result.observation());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

use crate::search::{
    format_hits_for_observation, format_page_observation, SearchError, SearchOptions,
    SearchProvider, DEFAULT_PAGE_CHAR_LIMIT,
};
use crate::tool_protocol::{
    required_str, ToolError, ToolMetadata, ToolOutcome, ToolParameter, ToolParameterType,
    ToolProtocol, ToolResult,
};

pub const SEARCH_TOOL: &str = "search";
pub const VISIT_TOOL: &str = "visit";

/// `search` and `visit` tools backed by a [`SearchProvider`].
pub struct WebResearchProtocol {
    provider: Arc<dyn SearchProvider>,
    search_options: SearchOptions,
    page_char_limit: usize,
}

impl WebResearchProtocol {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            search_options: SearchOptions::for_agent(),
            page_char_limit: DEFAULT_PAGE_CHAR_LIMIT,
        }
    }

    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search_options = options;
        self
    }

    pub fn with_page_char_limit(mut self, limit: usize) -> Self {
        self.page_char_limit = limit;
        self
    }

    async fn search(&self, query: &str) -> ToolResult {
        match self.provider.search(query, &self.search_options).await {
            Ok(hits) => ToolResult::success(json!(format_hits_for_observation(&hits)))
                .with_metadata("hits", json!(hits.len())),
            Err(err) => {
                log::warn!("WebResearchProtocol::search failed for {}: {}", query, err);
                ToolResult::failure(failure_text("Search failed", err.as_ref()))
            }
        }
    }

    async fn visit(&self, url: &str) -> ToolResult {
        match self.provider.contents(url, self.page_char_limit).await {
            Ok(page) => {
                let chars = page.text.chars().count();
                ToolResult::success(json!(format_page_observation(
                    url,
                    &page.text,
                    self.page_char_limit
                )))
                .with_metadata("characters", json!(chars))
            }
            Err(err) => {
                log::warn!("WebResearchProtocol::visit failed for {}: {}", url, err);
                let text = match err.downcast_ref::<SearchError>() {
                    Some(SearchError::NoContent(_)) => "Failed to retrieve content.".to_string(),
                    _ => failure_text("Visit failed", err.as_ref()),
                };
                ToolResult::failure(text)
            }
        }
    }
}

fn failure_text(prefix: &str, err: &(dyn Error + Send + Sync + 'static)) -> String {
    match err.downcast_ref::<SearchError>() {
        Some(SearchError::MissingApiKey) => "Error: EXA_API_KEY not set.".to_string(),
        _ => format!("{}: {}", prefix, err),
    }
}

#[async_trait]
impl ToolProtocol for WebResearchProtocol {
    async fn execute(&self, tool_name: &str, parameters: Value) -> ToolOutcome<ToolResult> {
        match tool_name {
            SEARCH_TOOL => Ok(self.search(required_str(&parameters, "query")?).await),
            VISIT_TOOL => Ok(self.visit(required_str(&parameters, "url")?).await),
            other => Err(Box::new(ToolError::NotFound(other.to_string()))),
        }
    }

    async fn list_tools(&self) -> ToolOutcome<Vec<ToolMetadata>> {
        Ok(vec![
            ToolMetadata::new(
                SEARCH_TOOL,
                "Use to find URLs. (Returns summaries only).",
            )
            .with_parameter(
                ToolParameter::new("query", ToolParameterType::String)
                    .with_description("Search query")
                    .required(),
            ),
            ToolMetadata::new(
                VISIT_TOOL,
                format!(
                    "Use to read the EXTENSIVE content of a URL. This tool can fetch up to {} characters. \
                     USE THIS for technical reports, papers, or when looking for specific data points buried deep in text.",
                    self.page_char_limit
                ),
            )
            .with_parameter(
                ToolParameter::new("url", ToolParameterType::String)
                    .with_description("Page URL")
                    .required(),
            ),
        ])
    }

    fn protocol_name(&self) -> &str {
        "web-research"
    }
}
