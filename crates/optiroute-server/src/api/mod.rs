//! HTTP surface of the route ranking service.

pub mod request_id;
mod routes;

use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    routes::create_router()
}

/// Router with state, CORS, tracing and request-id layers applied.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config().cors_origins);
    routes()
        .with_state(state)
        .layer(middleware::from_fn(request_id::ensure_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests;
