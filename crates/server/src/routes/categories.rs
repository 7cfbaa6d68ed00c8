use axum::{
    Extension, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::category::{
    Category, CategoryError, CategoryWithTaskCount, CreateCategory, TaskWithCategories,
    UpdateCategory,
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use super::input::{optional_max_len, required_text};
use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

const MAX_COLOR_CHARS: usize = 7;
const MAX_ICON_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachCategoriesRequest {
    pub category_ids: Option<Vec<i64>>,
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/categories", get(get_categories).post(create_category))
        .route(
            "/categories/{category_id}",
            put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/tasks/{task_id}/categories", post(attach_to_task))
}

fn check_style(req: &CategoryRequest) -> Result<(), ApiError> {
    optional_max_len("color", req.color.as_deref(), MAX_COLOR_CHARS)?;
    optional_max_len("icon", req.icon.as_deref(), MAX_ICON_CHARS)
}

pub async fn get_categories(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
) -> Result<ResponseJson<ApiResponse<Vec<CategoryWithTaskCount>>>, ApiError> {
    let categories =
        Category::find_by_user_with_counts(&deployment.db().pool, ctx.user_id()).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub async fn create_category(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    payload: Result<ResponseJson<CategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Category>>), ApiError> {
    let ResponseJson(req) = payload?;
    check_style(&req)?;
    let data = CreateCategory {
        name: required_text("name", req.name, 255)?,
        color: req.color,
        icon: req.icon,
    };

    let category = Category::create(&deployment.db().pool, ctx.user_id(), &data).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(category)),
    ))
}

pub async fn update_category(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(category_id): Path<i64>,
    payload: Result<ResponseJson<CategoryRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    let ResponseJson(req) = payload?;
    check_style(&req)?;
    let name = match req.name {
        Some(name) => Some(required_text("name", Some(name), 255)?),
        None => None,
    };

    let category = Category::update(
        &deployment.db().pool,
        category_id,
        ctx.user_id(),
        &UpdateCategory {
            name,
            color: req.color,
            icon: req.icon,
        },
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

pub async fn delete_category(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(category_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected =
        Category::delete(&deployment.db().pool, category_id, ctx.user_id()).await?;
    if rows_affected == 0 {
        return Err(CategoryError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::message_only("Category deleted")))
}

/// Replace the task's category set with `category_ids`.
pub async fn attach_to_task(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
    Path(task_id): Path<i64>,
    payload: Result<ResponseJson<AttachCategoriesRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<TaskWithCategories>>, ApiError> {
    let ResponseJson(req) = payload?;
    let category_ids = req.category_ids.ok_or_else(|| {
        ApiError::Validation("The category ids field is required.".to_string())
    })?;

    let task = Category::sync_task_categories(
        &deployment.db().pool,
        task_id,
        ctx.user_id(),
        &category_ids,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}
