use axum::{
    Extension, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::post,
};
use assistant::PipelineReport;
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use super::input::required_text;
use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

#[derive(Debug, Deserialize)]
pub struct ProcessGoalRequest {
    pub goal: Option<String>,
    pub context: Option<String>,
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/multi-agent/process", post(process_goal))
}

/// POST /multi-agent/process
pub async fn process_goal(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<ProcessGoalRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<PipelineReport>>, ApiError> {
    let ResponseJson(req) = payload?;
    let goal = required_text("goal", req.goal, usize::MAX)?;

    let report = deployment
        .pipeline()
        .process(
            &deployment.db().pool,
            ctx.user_id(),
            &goal,
            req.context.as_deref(),
        )
        .await
        .map_err(ApiError::assistant("Multi-agent processing failed"))?;

    Ok(ResponseJson(ApiResponse::success(report)))
}
