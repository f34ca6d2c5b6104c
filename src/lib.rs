//! # llmkit
//!
//! llmkit is a toolbox of small LLM-powered workflows that share one thin library layer:
//! a provider-neutral chat abstraction, robust JSON extraction from free-form replies, a
//! semantic search client and a pooled HTTP stack.
//!
//! The crate provides:
//!
//! * **Chat clients**: the [`ClientWrapper`] trait with an OpenAI-compatible client
//!   (SiliconFlow, Gemini) and a local Ollama client, both able to stream answer and
//!   reasoning deltas separately.
//! * **ReAct agent**: [`ReActAgent`] runs a bounded reason/act loop where the model emits a
//!   JSON decision each step and tools from a [`tool_protocol::ToolRegistry`] answer with
//!   observations.
//! * **Deep research**: [`ResearchRunner`] generates queries over several depth levels,
//!   searches and analyses sources, writes a synthesis and saves the run as JSON.
//! * **Workflows**: commit messages from staged diffs ([`commit_message`]), streamed code
//!   reviews ([`code_review`]), AI news digests ([`daily_news`]), local translation
//!   ([`translate`]), persistent multimodal chat ([`conversation`]) and page images to
//!   Markdown ([`page_ocr`]).
//!
//! ## ReAct in a nutshell
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llmkit::client_wrapper::NoopSink;
//! use llmkit::tool_protocol::ToolRegistry;
//! use llmkit::tool_protocols::WebResearchProtocol;
//! use llmkit::{LlmKitConfig, ReActAgent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = LlmKitConfig::from_env();
//!     let client = Arc::new(config.llm_client(&config.chat_model));
//!     let web = Arc::new(WebResearchProtocol::new(Arc::new(config.exa_client())));
//!     let tools = ToolRegistry::from_protocol(web).await?;
//!
//!     let outcome = ReActAgent::new(client, tools)
//!         .with_max_steps(7)
//!         .run("Who proposed the transformer architecture?", &NoopSink)
//!         .await;
//!     println!("{:?}: {:?}", outcome.termination, outcome.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Deep research
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llmkit::client_wrapper::NoopSink;
//! use llmkit::research::{ResearchConfig, ResearchStore};
//! use llmkit::{LlmKitConfig, ResearchRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = LlmKitConfig::from_env();
//!     let runner = ResearchRunner::new(
//!         Arc::new(config.llm_client(&config.research_model)),
//!         Arc::new(config.exa_client()),
//!     )
//!     .with_config(ResearchConfig::default().with_depth(2))
//!     .with_store(ResearchStore::new(&config.research_dir));
//!
//!     let report = runner.run("固态电池的最新进展", &NoopSink).await?;
//!     println!("{}", report.to_markdown());
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade. Call [`init_logger`] once to get
//! `RUST_LOG`-driven output on stderr.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// ```rust
/// llmkit::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `llmkit` module.
pub mod llmkit;

// Re-exporting key items for easier external access.
pub use llmkit::client_wrapper;
pub use llmkit::client_wrapper::{
    ChatOptions, ChatResponse, ClientWrapper, Message, MessageChunk, MessageChunkStream, Role,
    StreamSink,
};
pub use llmkit::clients;
pub use llmkit::config;
pub use llmkit::config::LlmKitConfig;
pub use llmkit::http_client_pool;
pub use llmkit::json_extract;
pub use llmkit::search;
pub use llmkit::store;

// Tool dispatch and observability
pub use llmkit::event;
pub use llmkit::event::{AgentEvent, EventHandler, ResearchEvent};
pub use llmkit::tool_protocol;
pub use llmkit::tool_protocols;
pub use llmkit::tools;

// Workflows
pub use llmkit::code_review;
pub use llmkit::commit_message;
pub use llmkit::conversation;
pub use llmkit::conversation::Conversation;
pub use llmkit::daily_news;
pub use llmkit::page_ocr;
pub use llmkit::react_agent;
pub use llmkit::react_agent::ReActAgent;
pub use llmkit::research;
pub use llmkit::research::ResearchRunner;
pub use llmkit::translate;
