use axum::{
    Router,
    middleware,
    routing::{IntoMakeService, get},
};
use tower_http::cors::CorsLayer;

use crate::{DeploymentImpl, middleware as app_middleware};

pub mod ai;
pub mod auth;
pub mod categories;
pub mod documents;
pub mod health;
mod input;
pub mod multi_agent;
pub mod tasks;

/// The full application under `/api`, without the make-service wrapper.
pub fn app(deployment: DeploymentImpl) -> Router {
    // Everything here requires a bearer token
    let protected_routes = Router::new()
        .merge(auth::router())
        .merge(tasks::router())
        .merge(categories::router())
        .merge(ai::router())
        .merge(documents::router())
        .merge(multi_agent::router())
        .route_layer(middleware::from_fn_with_state(
            deployment.clone(),
            app_middleware::require_auth,
        ));

    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::public_router())
        .merge(protected_routes)
        .with_state(deployment);

    Router::new()
        .nest("/api", base_routes)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(deployment).into_make_service()
}

#[cfg(test)]
mod tests;
