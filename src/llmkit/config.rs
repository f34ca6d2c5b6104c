//! Configuration for llmkit.
//!
//! [`LlmKitConfig`] gathers API keys, endpoints, model names and output
//! directories. Users construct it manually or from the environment; no
//! config-file parsing is involved.
//!
//! # Example
//!
//! ```rust
//! use llmkit::LlmKitConfig;
//! use std::path::PathBuf;
//!
//! let config = LlmKitConfig {
//!     research_dir: PathBuf::from("/tmp/research"),
//!     ..LlmKitConfig::default()
//! };
//! assert_eq!(config.chat_model, "deepseek-ai/DeepSeek-V3.2");
//! ```

use std::path::PathBuf;

use crate::clients::ollama::OLLAMA_BASE_URL;
use crate::clients::openai::{OpenAICompatibleClient, SILICONFLOW_BASE_URL};
use crate::search::exa::{ExaClient, EXA_BASE_URL};

/// Environment variable holding the chat provider key.
pub const LLM_API_KEY_ENV: &str = "SILICONFLOW_API_KEY";
/// Environment variable holding the Exa key.
pub const EXA_API_KEY_ENV: &str = "EXA_API_KEY";
/// Environment variable holding the Gemini key used by `chat`.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Global configuration shared by the tools.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmKitConfig {
    /// Bearer key for the OpenAI-compatible provider.
    pub llm_api_key: String,
    /// Base URL of the OpenAI-compatible provider.
    pub llm_base_url: String,
    /// Default text model (ReAct, commit messages, reviews, news, refining).
    pub chat_model: String,
    /// Model used by deep research for query generation, analysis and synthesis.
    pub research_model: String,
    /// Vision model used for page OCR.
    pub vision_model: String,
    /// Exa search key.
    pub exa_api_key: String,
    /// Exa base URL.
    pub exa_base_url: String,
    /// Gemini key for the interactive chat.
    pub gemini_api_key: String,
    /// Model used by the interactive chat.
    pub gemini_model: String,
    /// Local Ollama daemon.
    pub ollama_base_url: String,
    /// Where research runs are saved.
    pub research_dir: PathBuf,
    /// Where chat conversations are saved.
    pub chat_history_dir: PathBuf,
    /// Where daily news reports are written.
    pub news_dir: PathBuf,
}

impl Default for LlmKitConfig {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_base_url: SILICONFLOW_BASE_URL.to_string(),
            chat_model: "deepseek-ai/DeepSeek-V3.2".to_string(),
            research_model: "Pro/zai-org/GLM-4.7".to_string(),
            vision_model: "zai-org/GLM-4.6V".to_string(),
            exa_api_key: String::new(),
            exa_base_url: EXA_BASE_URL.to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-3-flash-preview".to_string(),
            ollama_base_url: OLLAMA_BASE_URL.to_string(),
            research_dir: PathBuf::from("output/DeepResearch"),
            chat_history_dir: PathBuf::from("ChatHistory"),
            news_dir: PathBuf::from("DailyNews"),
        }
    }
}

impl LlmKitConfig {
    /// Defaults with keys read from the environment (missing keys stay empty).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults with keys read through `lookup`; used by tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            llm_api_key: lookup(LLM_API_KEY_ENV).unwrap_or_default(),
            exa_api_key: lookup(EXA_API_KEY_ENV).unwrap_or_default(),
            gemini_api_key: lookup(GEMINI_API_KEY_ENV).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Whether the chat provider key is present.
    pub fn has_llm_key(&self) -> bool {
        !self.llm_api_key.trim().is_empty()
    }

    /// Client for `model` on the configured OpenAI-compatible provider.
    pub fn llm_client(&self, model: &str) -> OpenAICompatibleClient {
        OpenAICompatibleClient::new(&self.llm_api_key, model, &self.llm_base_url)
    }

    /// Exa client with the configured key and endpoint.
    pub fn exa_client(&self) -> ExaClient {
        ExaClient::with_base_url(&self.exa_api_key, &self.exa_base_url)
    }
}
