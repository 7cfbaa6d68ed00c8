use axum::{
    Extension, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::post,
};
use assistant::DocumentAnalysis;
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

#[derive(Debug, Deserialize)]
pub struct AnalyzeDocumentRequest {
    pub text: Option<String>,
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/documents/analyze", post(analyze_document))
}

/// POST /documents/analyze
pub async fn analyze_document(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<AnalyzeDocumentRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<DocumentAnalysis>>, ApiError> {
    let ResponseJson(req) = payload?;
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("The text field is required.".to_string()))?;

    let analysis = deployment
        .documents()
        .analyze(&deployment.db().pool, ctx.user_id(), &text)
        .await
        .map_err(ApiError::assistant("Document analysis failed"))?;

    Ok(ResponseJson(ApiResponse::success(analysis)))
}
