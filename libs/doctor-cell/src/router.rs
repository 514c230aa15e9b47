use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/search", get(handlers::search_doctors))
        .route("/featured", get(handlers::list_featured_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", put(handlers::upsert_my_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
