use axum::{
    Extension, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use chrono::Utc;
use db::models::task::{
    CreateTask, DueFilter, StatusFilter, Task, TaskError, TaskFilter, TaskStats, UpdateTask,
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use super::input::{optional_date, optional_hours, optional_priority, required_text};
use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

const MAX_TITLE_CHARS: usize = 255;

/// Query string for `GET /tasks`. Unrecognised `status` and `due_filter`
/// values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_filter: Option<String>,
    pub search: Option<String>,
}

impl TaskQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        let status = match self.status.as_deref() {
            Some("completed") => Some(StatusFilter::Completed),
            Some("pending") => Some(StatusFilter::Pending),
            _ => None,
        };
        let due = match self.due_filter.as_deref() {
            Some("overdue") => Some(DueFilter::Overdue),
            Some("today") => Some(DueFilter::Today),
            Some("upcoming") => Some(DueFilter::Upcoming),
            _ => None,
        };

        Ok(TaskFilter {
            status,
            priority: optional_priority(self.priority.as_deref())?,
            due,
            search: self.search,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub reminder_date: Option<String>,
    pub priority: Option<String>,
    pub estimated_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub due_date: Option<String>,
    pub reminder_date: Option<String>,
    pub priority: Option<String>,
    pub estimated_hours: Option<i64>,
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .route("/tasks/stats", get(get_stats))
        .route(
            "/tasks/{task_id}",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
}

pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let filter = query.into_filter()?;
    let tasks =
        Task::find_filtered(&deployment.db().pool, ctx.user_id(), &filter, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let ResponseJson(req) = payload?;
    let data = CreateTask {
        title: required_text("title", req.title, MAX_TITLE_CHARS)?,
        description: req.description,
        due_date: optional_date("due_date", req.due_date.as_deref())?,
        reminder_date: optional_date("reminder_date", req.reminder_date.as_deref())?,
        priority: optional_priority(req.priority.as_deref())?,
        estimated_hours: optional_hours(req.estimated_hours)?,
    };

    let task = Task::create(&deployment.db().pool, ctx.user_id(), &data).await?;
    tracing::debug!("Created task {} for user {}", task.id, ctx.user_id());
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

pub async fn get_stats(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
) -> Result<ResponseJson<ApiResponse<TaskStats>>, ApiError> {
    let stats = Task::stats(&deployment.db().pool, ctx.user_id(), Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn get_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(task_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::find_by_id_for_user(&deployment.db().pool, task_id, ctx.user_id())
        .await?
        .ok_or(TaskError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(task_id): Path<i64>,
    payload: Result<ResponseJson<UpdateTaskRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let ResponseJson(req) = payload?;

    let title = match req.title {
        Some(title) => Some(required_text("title", Some(title), MAX_TITLE_CHARS)?),
        None => None,
    };

    let data = UpdateTask {
        title,
        description: req.description,
        is_completed: req.is_completed,
        due_date: optional_date("due_date", req.due_date.as_deref())?,
        reminder_date: optional_date("reminder_date", req.reminder_date.as_deref())?,
        priority: optional_priority(req.priority.as_deref())?,
        estimated_hours: optional_hours(req.estimated_hours)?,
    };

    let task = Task::update(&deployment.db().pool, task_id, ctx.user_id(), &data).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(task_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Task::delete(&deployment.db().pool, task_id, ctx.user_id()).await?;
    if rows_affected == 0 {
        return Err(TaskError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::message_only(
        "Task deleted successfully",
    )))
}
