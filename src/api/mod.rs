//! API module for handling HTTP requests and responses

#[cfg(feature = "web")]
pub(crate) mod handlers;
#[cfg(feature = "web")]
pub(crate) mod responses;

#[cfg(feature = "web")]
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
#[cfg(feature = "web")]
use std::sync::Arc;
#[cfg(feature = "web")]
use tower::ServiceBuilder;
#[cfg(feature = "web")]
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};
#[cfg(feature = "web")]
use crate::state::{AppState, Config};

#[cfg(feature = "web")]
use handlers::health_check;

#[cfg(feature = "web")]
/// Create the application router with all routes
pub fn create_router(config: &Config) -> Router<Arc<AppState>> {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/model", get(handlers::model_info))
        .route("/api/model/reload", post(handlers::reload_model))
        .route("/api/rank", post(handlers::rank_image))
        .route("/api/rank/distances", post(handlers::rank_distances))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                // Uploads are bounded by the configured size instead of axum's default
                .layer(DefaultBodyLimit::disable())
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(config.max_upload_size)),
        )
}
