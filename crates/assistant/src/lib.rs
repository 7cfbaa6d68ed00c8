//! # Assistant
//!
//! The LLM layer behind the task API: completion providers, prompt rendering,
//! JSON extraction from completions, intent interpretation, task analysis,
//! document extraction and the four-stage planning pipeline.

pub mod actions;
pub mod analyzer;
pub mod brain;
pub mod chat;
pub mod documents;
pub mod extract;
pub mod intent;
pub mod pipeline;
pub mod prompt;

pub use actions::{ActionInterpreter, ActionOutcome};
pub use analyzer::{TaskAnalysis, TaskAnalyzer};
pub use brain::{CallKind, LLMClient, LLMConfig, ProviderError, ProviderType};
pub use chat::{ChatReply, ChatSession};
pub use documents::{DocumentAnalysis, DocumentExtractor, ExtractedTask};
pub use extract::{Extracted, extract};
pub use pipeline::{AgentTurn, CreatedPlanTask, PipelineOrchestrator, PipelineReport};
pub use prompt::{ConversationTurn, TaskCounts};

/// Main error type for assistant operations
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The completion service failed, timed out or returned a non-success status.
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    /// A pipeline agent's completion call failed.
    #[error("Agent '{stage}' API call failed: {source}")]
    AgentUpstream {
        stage: String,
        #[source]
        source: ProviderError,
    },

    /// The completion arrived but did not contain the JSON the flow requires.
    #[error("{stage} returned {detail}")]
    MalformedOutput { stage: String, detail: String },

    #[error("Coordinator did not return valid final_tasks array")]
    MissingFinalTasks,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AssistantError {
    pub(crate) fn malformed(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        AssistantError::MalformedOutput {
            stage: stage.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
