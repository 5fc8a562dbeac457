use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, ProviderState};

pub fn provider_routes(state: Arc<ProviderState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_providers))
        .route("/{provider_id}", get(handlers::get_provider));

    let protected_routes = Router::new()
        .route("/", post(handlers::register_provider))
        .route("/{provider_id}", put(handlers::update_provider))
        .route("/{provider_id}/availability/toggle", post(handlers::toggle_availability))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
