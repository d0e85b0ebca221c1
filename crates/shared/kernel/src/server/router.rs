use super::{health, query, scope};
use crate::container::Container;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Routes served on top of the process registry: `GET /health` and `POST /query`.
pub fn platform_router(root: Container) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/query", post(query::query_handler))
        .layer(middleware::from_fn_with_state(root, scope::request_scope))
        .layer(TraceLayer::new_for_http())
}
