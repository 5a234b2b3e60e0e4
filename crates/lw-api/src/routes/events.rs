//! Push delivery endpoint.

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use std::time::Instant;

use crate::dto::EventResponse;
use crate::state::AppState;

/// Creates push delivery routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(receive_event))
        .route("/events", post(receive_event))
}

/// Receive one asset change delivery.
///
/// The body is a Pub/Sub push envelope, or a structured CloudEvent wrapping
/// one. The response is always `200` so the message is acknowledged; the
/// outcome is reported in the body.
#[utoipa::path(
    post,
    path = "/events",
    request_body(
        content = String,
        description = "Pub/Sub push envelope or structured CloudEvent",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Delivery acknowledged", body = EventResponse)
    ),
    tag = "Events"
)]
pub async fn receive_event(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<EventResponse>) {
    state.metrics.record_received();
    let start = Instant::now();

    let outcome = state.handler.handle(&body).await;

    state.metrics.record_outcome(&outcome, start.elapsed());
    (StatusCode::OK, Json(EventResponse::from(&outcome)))
}
