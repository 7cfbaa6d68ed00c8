use axum::{
    Extension, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    models::{
        session::Session,
        user::{CreateUser, User},
    },
    services::AuthService,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use super::input::required_text;
use crate::{DeploymentImpl, error::ApiError, middleware::AccessContext};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub token_type: String,
}

/// Routes reachable without a session.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

async fn issue_token(deployment: &DeploymentImpl, user: User) -> Result<AuthResponse, ApiError> {
    let (_, token) =
        Session::issue(&deployment.db().pool, user.id, deployment.config().session_ttl()).await?;
    Ok(AuthResponse {
        user,
        token,
        token_type: "Bearer".to_string(),
    })
}

/// POST /register
async fn register(
    State(deployment): State<DeploymentImpl>,
    payload: Result<ResponseJson<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthResponse>>), ApiError> {
    let ResponseJson(req) = payload?;
    let name = required_text("name", req.name, 255)?;
    let email = required_text("email", req.email, 255)?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::Validation(
            "The email field must be a valid email address.".to_string(),
        ));
    }
    let password = req
        .password
        .ok_or_else(|| ApiError::Validation("The password field is required.".to_string()))?;
    AuthService::check_password_policy(&password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if let Some(confirmation) = &req.password_confirmation
        && confirmation != &password
    {
        return Err(ApiError::Validation(
            "The password field confirmation does not match.".to_string(),
        ));
    }

    let password_hash = tokio::task::spawn_blocking(move || AuthService::hash_password(&password))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))?
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = User::create(
        &deployment.db().pool,
        &CreateUser {
            name,
            email,
            password_hash,
        },
    )
    .await?;
    tracing::info!("Registered user {}", user.id);

    let response = issue_token(&deployment, user).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(response)),
    ))
}

/// POST /login
async fn login(
    State(deployment): State<DeploymentImpl>,
    payload: Result<ResponseJson<LoginRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    let ResponseJson(req) = payload?;
    let email = required_text("email", req.email, 255)?;
    let password = req
        .password
        .ok_or_else(|| ApiError::Validation("The password field is required.".to_string()))?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let user = User::find_by_email(&deployment.db().pool, &email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || AuthService::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password check failed: {}", e)))?;
    if !valid {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let response = issue_token(&deployment, user).await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

/// POST /logout
async fn logout(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<AccessContext>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Session::revoke(&deployment.db().pool, &ctx.token).await?;
    Ok(ResponseJson(ApiResponse::message_only(
        "Successfully logged out",
    )))
}

/// GET /user
async fn current_user(
    Extension(ctx): Extension<AccessContext>,
) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(ctx.user))
}
