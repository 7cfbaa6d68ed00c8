use anyhow::Error as AnyhowError;
use assistant::{ChatSession, DocumentExtractor, LLMClient, PipelineOrchestrator, TaskAnalyzer};
use async_trait::async_trait;
use db::{DBService, models::session::Session};
use sqlx::Error as SqlxError;
use thiserror::Error;

mod config;

pub use config::{AppConfig, ConfigError};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &AppConfig;

    fn db(&self) -> &DBService;

    fn llm(&self) -> &LLMClient;

    fn chat(&self) -> ChatSession {
        ChatSession::new(self.llm().clone())
    }

    fn analyzer(&self) -> TaskAnalyzer {
        TaskAnalyzer::new(self.llm().clone())
    }

    fn documents(&self) -> DocumentExtractor {
        DocumentExtractor::new(self.llm().clone())
    }

    fn pipeline(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(self.llm().clone())
    }

    /// Drop expired sessions, call at startup
    async fn cleanup_expired_sessions(&self) -> Result<(), DeploymentError> {
        let removed = Session::cleanup_expired(&self.db().pool).await?;
        if removed > 0 {
            tracing::info!("Removed {} expired sessions", removed);
        }
        Ok(())
    }
}
