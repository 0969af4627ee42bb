pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::reviews::handlers as reviews;
use crate::state::AppState;
use crate::synthesis::handlers as synthesis;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Synthesis API
        .route(
            "/api/v1/reviews/synthesize",
            post(synthesis::handle_synthesize).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Review storage API
        .route("/api/v1/reviews", post(reviews::handle_create_review))
        .route("/api/v1/reviews/:id", get(reviews::handle_get_review))
        .route(
            "/api/v1/reviews/:id/history",
            get(reviews::handle_get_history),
        )
        .route(
            "/api/v1/reviews/:id/generated",
            put(reviews::handle_save_generated),
        )
        .route("/api/v1/reviews/:id/final", patch(reviews::handle_save_final))
        .route(
            "/api/v1/reviews/:id/status",
            post(reviews::handle_change_status),
        )
        .with_state(state)
}
