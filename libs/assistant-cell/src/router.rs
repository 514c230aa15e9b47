use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn assistant_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/analyze-report", post(handlers::analyze_report))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
