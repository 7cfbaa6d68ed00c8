use axum::{extract::State, response::Json as ResponseJson};
use deployment::Deployment;
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub assistant_provider: String,
    pub assistant_configured: bool,
}

pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<HealthStatus>> {
    let llm = deployment.llm();
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        assistant_provider: llm.provider_name().to_string(),
        assistant_configured: llm.is_configured(),
    }))
}
