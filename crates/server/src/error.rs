use assistant::AssistantError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::{category::CategoryError, task::TaskError, user::UserError};
use deployment::DeploymentError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// An assistant flow failed; `action` names the endpoint's operation.
    #[error("{action}: {source}")]
    Assistant {
        action: &'static str,
        #[source]
        source: AssistantError,
    },
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn assistant(action: &'static str) -> impl FnOnce(AssistantError) -> ApiError {
        move |source| ApiError::Assistant { action, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Task(err) => match err {
                TaskError::NotFound => (StatusCode::NOT_FOUND, "TaskNotFound"),
                TaskError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Category(err) => match err {
                CategoryError::NotFound => (StatusCode::NOT_FOUND, "CategoryNotFound"),
                CategoryError::TaskNotFound => (StatusCode::NOT_FOUND, "TaskNotFound"),
                CategoryError::UnknownCategories(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError")
                }
                CategoryError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CategoryError"),
            },
            ApiError::User(err) => match err {
                UserError::EmailTaken => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserNotFound"),
                UserError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::Assistant { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "AssistantError"),
            ApiError::Json(rejection) => (rejection.status(), "InvalidBody"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::Task(TaskError::NotFound) => "Task not found".to_string(),
            ApiError::Category(CategoryError::NotFound) => "Category not found".to_string(),
            ApiError::Category(CategoryError::TaskNotFound) => "Task not found".to_string(),
            ApiError::Category(CategoryError::UnknownCategories(ids)) => {
                format!("The selected category_ids are invalid: {:?}", ids)
            }
            ApiError::User(UserError::EmailTaken) => {
                "The email has already been taken.".to_string()
            }
            ApiError::Assistant { .. } => self.to_string(),
            ApiError::Json(rejection) => rejection.body_text(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::InternalError(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!("{} ({}): {}", error_type, status_code, self);
        }

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use assistant::ProviderError;
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn upstream_failure_carries_the_upstream_body() {
        let err = ApiError::assistant("AI request failed")(AssistantError::Upstream(
            ProviderError::ApiError {
                status: 429,
                message: "quota exceeded".to_string(),
            },
        ));

        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "AI request failed: API error (429): quota exceeded"
        );
    }

    #[tokio::test]
    async fn lookups_map_to_not_found() {
        let (status, body) = render(TaskError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");
    }

    #[tokio::test]
    async fn foreign_categories_are_unprocessable() {
        let (status, _) = render(CategoryError::UnknownCategories(vec![9]).into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
