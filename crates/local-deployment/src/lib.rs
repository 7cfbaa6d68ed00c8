use std::sync::Arc;

use assistant::LLMClient;
use async_trait::async_trait;
use db::DBService;
use deployment::{AppConfig, Deployment, DeploymentError};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<AppConfig>,
    db: DBService,
    llm: LLMClient,
}

impl LocalDeployment {
    /// Assemble a deployment from ready-made parts, e.g. an in-memory
    /// database and a scripted completion provider.
    pub fn from_parts(config: AppConfig, db: DBService, llm: LLMClient) -> Self {
        Self {
            config: Arc::new(config),
            db,
            llm,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = AppConfig::from_env()?;
        let db = DBService::new_with_url(&config.database_url).await?;

        let llm = LLMClient::new(config.llm.clone());
        if llm.is_configured() {
            tracing::info!(
                "Completion provider {} ready (model {})",
                llm.provider_name(),
                llm.model()
            );
        } else {
            tracing::warn!(
                "Completion provider {} has no API key; assistant endpoints will fail",
                llm.provider_name()
            );
        }

        let deployment = Self::from_parts(config, db, llm);
        deployment.cleanup_expired_sessions().await?;
        Ok(deployment)
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn llm(&self) -> &LLMClient {
        &self.llm
    }
}
