use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::landing))
        .route("/health", get(handlers::health))
        .route("/labs", get(handlers::list_labs))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
