use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;
use crate::handlers::{health::health_handler, random::random_image};
use crate::infra::config::CorsConfig;

pub const RANDOM: &str = "/random";
pub const HEALTH: &str = "/health";

/// Build the router with CORS and request tracing layers.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = cors_layer(&state.config().cors);

    Router::new()
        .route(RANDOM, get(random_image))
        .route(HEALTH, get(health_handler))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        // Browser clients can only read these when exposed.
        .expose_headers([
            HeaderName::from_static("x-image-date"),
            HeaderName::from_static("x-image-name"),
        ])
}
