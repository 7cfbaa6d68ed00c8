use axum::{
    Extension, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::post,
};
use assistant::{ChatReply, ConversationTurn, TaskAnalysis};
use chrono::Utc;
use deployment::Deployment;
use serde::Deserialize;
use serde_json::Value;
use utils::response::ApiResponse;

use super::input::{optional_date, required_text};
use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub conversation_history: Option<Vec<Value>>,
}

/// A `description` may be sent; the analysis does not read it.
#[derive(Debug, Deserialize)]
pub struct AnalyzeTaskRequest {
    pub title: Option<String>,
    pub due_date: Option<String>,
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/ai/chat", post(chat))
        .route("/ai/analyze-task", post(analyze_task))
}

/// POST /ai/chat
pub async fn chat(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<ChatRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<ChatReply>>, ApiError> {
    let ResponseJson(req) = payload?;
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("The message field is required.".to_string()))?;
    let history = ConversationTurn::parse_history(&req.conversation_history.unwrap_or_default());

    let reply = deployment
        .chat()
        .respond(
            &deployment.db().pool,
            &ctx.user,
            &message,
            &history,
            Utc::now(),
        )
        .await
        .map_err(ApiError::assistant("AI request failed"))?;

    Ok(ResponseJson(ApiResponse::success(reply)))
}

/// POST /ai/analyze-task
pub async fn analyze_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<AnalyzeTaskRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<TaskAnalysis>>, ApiError> {
    let ResponseJson(req) = payload?;
    let title = required_text("title", req.title, usize::MAX)?;
    let due = optional_date("due_date", req.due_date.as_deref())?;

    let analysis = deployment
        .analyzer()
        .analyze(&deployment.db().pool, ctx.user_id(), &title, due, Utc::now())
        .await
        .map_err(ApiError::assistant("Task analysis failed"))?;

    Ok(ResponseJson(ApiResponse::success(analysis)))
}
