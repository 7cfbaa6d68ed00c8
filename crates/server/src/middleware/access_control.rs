use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use db::models::{session::Session, user::User};
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user: User,
    /// The bearer token this request presented.
    pub token: String,
}

impl AccessContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

fn bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token in `auth_header` to a live session.
pub async fn get_current_user(
    deployment: &DeploymentImpl,
    auth_header: Option<&str>,
) -> Result<AccessContext, ApiError> {
    let Some(token) = bearer_token(auth_header) else {
        return Err(ApiError::Unauthorized("Unauthenticated.".to_string()));
    };

    match Session::find_user_by_token(&deployment.db().pool, token).await? {
        Some(user) => Ok(AccessContext {
            user,
            token: token.to_string(),
        }),
        None => Err(ApiError::Unauthorized("Unauthenticated.".to_string())),
    }
}

/// Middleware to require authentication
pub async fn require_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let context = get_current_user(&deployment, auth_header).await?;
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(context.user.id.to_string()),
            email: Some(context.user.email.clone()),
            ..Default::default()
        }));
    });

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}
