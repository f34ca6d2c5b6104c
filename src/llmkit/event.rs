//! Progress events for the ReAct agent and the deep-research runner.
//!
//! Implement [`EventHandler`] to follow a run as it happens. Both methods
//! default to no-ops, so a handler only overrides what it cares about. The
//! handler is shared as `Arc<dyn EventHandler>`.
//!
//! ```rust,no_run
//! use llmkit::event::{AgentEvent, EventHandler, ResearchEvent};
//! use async_trait::async_trait;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler for Printer {
//!     async fn on_agent_event(&self, event: &AgentEvent) {
//!         if let AgentEvent::DecisionParsed { step, thought, .. } = event {
//!             println!("[Step {} Decision] {}", step, thought);
//!         }
//!     }
//!     async fn on_research_event(&self, event: &ResearchEvent) {
//!         if let ResearchEvent::StepCompleted { progress, .. } = event {
//!             println!("{:.0}%", progress * 100.0);
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;

/// Where a decision JSON was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Content,
    Reasoning,
}

/// Why a ReAct loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model chose `answer`.
    Answered,
    /// The step budget ran out.
    MaxStepsReached,
    /// The model returned neither content nor reasoning.
    EmptyResponse,
}

/// Events emitted by [`ReActAgent`](crate::react_agent::ReActAgent).
///
/// ```text
/// Started
///   └─ LLMCallStarted { step: 1 }
///   └─ LLMCallCompleted { step: 1 }
///   └─ DecisionParsed | ParseFailed
///   └─ ToolExecuted
///   └─ ... up to max_steps
/// Terminated
/// ```
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Started {
        query: String,
        max_steps: usize,
    },
    /// Fired before each model round-trip. Steps are 1-based.
    LLMCallStarted {
        step: usize,
    },
    LLMCallCompleted {
        step: usize,
        content_length: usize,
        reasoning_length: usize,
    },
    /// Neither the content nor the reasoning trace held a decision.
    ParseFailed {
        step: usize,
    },
    DecisionParsed {
        step: usize,
        source: DecisionSource,
        thought: String,
        action: String,
        action_input: String,
    },
    /// A tool ran and produced the observation fed back to the model.
    ToolExecuted {
        step: usize,
        action: String,
        observation_length: usize,
        success: bool,
    },
    Terminated {
        steps: usize,
        reason: Termination,
    },
}

/// Events emitted by [`ResearchRunner`](crate::research::ResearchRunner).
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    Started {
        query: String,
        depth: usize,
        total_steps: usize,
    },
    /// Levels are 1-based.
    DepthStarted {
        level: usize,
    },
    QueriesGenerated {
        level: usize,
        queries: Vec<String>,
    },
    SearchCompleted {
        query: String,
        source_count: usize,
    },
    /// One query searched and analysed; `progress` is in `[0, 0.95]`.
    StepCompleted {
        query: String,
        completed: usize,
        total: usize,
        progress: f32,
    },
    /// `progress` is 0.96.
    SynthesisStarted {
        step_count: usize,
        progress: f32,
    },
    SynthesisCompleted {
        progress: f32,
    },
    Completed {
        elapsed_secs: f64,
    },
    Saved {
        filename: String,
    },
}

/// Receiver for agent and research events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_agent_event(&self, _event: &AgentEvent) {}

    async fn on_research_event(&self, _event: &ResearchEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Collector {
        async fn on_agent_event(&self, event: &AgentEvent) {
            self.seen.lock().unwrap().push(format!("{:?}", event));
        }
    }

    #[tokio::test]
    async fn test_default_methods_are_noops() {
        let collector = Collector::default();
        collector
            .on_research_event(&ResearchEvent::DepthStarted { level: 1 })
            .await;
        collector
            .on_agent_event(&AgentEvent::LLMCallStarted { step: 2 })
            .await;
        let seen = collector.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("LLMCallStarted"));
    }
}
