//! # lw-api
//!
//! HTTP host for Label Warden.
//!
//! Push deliveries arrive on `POST /` (or `POST /events`) and are handed to
//! the [`lw_core::AssetEventHandler`]. Every delivery is acknowledged with
//! `200 OK`, whatever its outcome, so the transport never redelivers it.

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
