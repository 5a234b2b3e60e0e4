//! API routes.

pub mod events;
pub mod health;
pub mod metrics;

use crate::error::ApiError;
use crate::state::AppState;
use axum::Router;

/// Creates the main router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(events::routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
