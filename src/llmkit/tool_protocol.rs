//! Tool dispatch for agent loops.
//!
//! A [`ToolProtocol`] executes named tools; a [`ToolRegistry`] maps the
//! `action` names a model emits onto those tools and renders their results as
//! observation text.
//!
//! ```text
//! ReActAgent → ToolRegistry → ToolProtocol (trait) → [WebResearchProtocol | user-defined]
//! ```
//!
//! ```rust
//! use llmkit::tool_protocol::{ToolParameter, ToolParameterType};
//!
//! let param = ToolParameter::new("query", ToolParameterType::String)
//!     .with_description("What to search for")
//!     .required();
//! assert!(param.required);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub type ToolOutcome<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Outcome of one tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Tool output; plain strings are used verbatim as observations.
    pub output: Value,
    pub error: Option<String>,
    /// Extra facts about the execution (e.g. characters retrieved).
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text handed back to the model.
    pub fn observation(&self) -> String {
        if !self.success {
            return self
                .error
                .clone()
                .unwrap_or_else(|| "Tool failed without a message.".to_string());
        }
        match &self.output {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Name, description and parameters of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Name of the parameter a bare `action_input` string is bound to.
    pub fn primary_parameter(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.required)
            .or_else(|| self.parameters.first())
            .map(|p| p.name.as_str())
    }
}

/// Executes named tools.
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    async fn execute(&self, tool_name: &str, parameters: Value) -> ToolOutcome<ToolResult>;

    /// Tools offered, in the order they should be presented to a model.
    async fn list_tools(&self) -> ToolOutcome<Vec<ToolMetadata>>;

    /// Protocol identifier, e.g. `"web-research"`.
    fn protocol_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ToolError {
    NotFound(String),
    ExecutionFailed(String),
    InvalidParameters(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "Tool not found: {}", name),
            ToolError::ExecutionFailed(msg) => write!(f, "Tool execution failed: {}", msg),
            ToolError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
        }
    }
}

impl Error for ToolError {}

struct RegisteredTool {
    metadata: ToolMetadata,
    protocol: Arc<dyn ToolProtocol>,
}

/// Ordered set of tools an agent may call.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every tool `protocol` lists.
    pub async fn from_protocol(protocol: Arc<dyn ToolProtocol>) -> ToolOutcome<Self> {
        let mut registry = Self::new();
        registry.add_protocol(protocol).await?;
        Ok(registry)
    }

    pub async fn add_protocol(&mut self, protocol: Arc<dyn ToolProtocol>) -> ToolOutcome<()> {
        for metadata in protocol.list_tools().await? {
            log::debug!(
                "ToolRegistry: registering {} from {}",
                metadata.name,
                protocol.protocol_name()
            );
            self.add_tool(metadata, protocol.clone());
        }
        Ok(())
    }

    /// Insert or replace a tool; replacing keeps its original position.
    pub fn add_tool(&mut self, metadata: ToolMetadata, protocol: Arc<dyn ToolProtocol>) {
        let entry = RegisteredTool { metadata, protocol };
        match self
            .tools
            .iter_mut()
            .find(|t| t.metadata.name == entry.metadata.name)
        {
            Some(slot) => *slot = entry,
            None => self.tools.push(entry),
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolMetadata> {
        self.tools
            .iter()
            .find(|t| t.metadata.name == name)
            .map(|t| &t.metadata)
    }

    pub fn list_tools(&self) -> Vec<&ToolMetadata> {
        self.tools.iter().map(|t| &t.metadata).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute_tool(&self, tool_name: &str, parameters: Value) -> ToolOutcome<ToolResult> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.metadata.name == tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        tool.protocol.execute(tool_name, parameters).await
    }

    /// Execute with a single string argument bound to the tool's primary parameter.
    pub async fn execute_with_input(&self, tool_name: &str, input: &str) -> ToolOutcome<ToolResult> {
        let metadata = self
            .get_tool(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        let parameters = match metadata.primary_parameter() {
            Some(name) => {
                let mut map = serde_json::Map::new();
                map.insert(name.to_string(), Value::String(input.to_string()));
                Value::Object(map)
            }
            None => Value::Object(serde_json::Map::new()),
        };
        self.execute_tool(tool_name, parameters).await
    }
}

/// Read a required string parameter.
pub fn required_str<'a>(parameters: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    parameters
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing string parameter '{}'", name)))
}
