mod health;
mod metrics;
mod height;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use height::height_handler;

// Every route the gateway serves
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/get_height", get(height_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
