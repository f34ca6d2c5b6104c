// src/llmkit/mod.rs

pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod event;
pub mod http_client_pool;
pub mod json_extract;
pub mod search;
pub mod store;
pub mod tool_protocol;
pub mod tool_protocols;
pub mod tools;

pub mod code_review;
pub mod commit_message;
pub mod conversation;
pub mod daily_news;
pub mod page_ocr;
pub mod react_agent;
pub mod research;
pub mod translate;

// Agent entry points, also reachable as llmkit::llmkit::ReActAgent etc.
pub use conversation::Conversation;
pub use react_agent::ReActAgent;
pub use research::ResearchRunner;
