//! # Keyward API
//!
//! REST API layer for Keyward.
//!
//! ## Endpoints
//!
//! - `POST /v1/data-keys` - Generate and store a wrapped data key
//! - `DELETE /v1/data-keys/{id}` - Delete a stored data key
//! - `POST /v1/encrypt` - Encrypt under a stored data key
//! - `POST /v1/decrypt` - Decrypt under a stored data key
//! - `POST /v1/master-keys/rotate` - Rotate the active master key
//! - `GET /v1/sys/health` - Health and key status (unauthenticated)
//!
//! Every binary field is standard base64. Callers authenticate with
//! `Authorization: Bearer <token>`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

pub use auth::Caller;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use types::*;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/sys/health", get(handlers::health))
        .route("/v1/data-keys", post(handlers::generate_data_key))
        .route("/v1/data-keys/{record_id}", delete(handlers::delete_data_key))
        .route("/v1/encrypt", post(handlers::encrypt))
        .route("/v1/decrypt", post(handlers::decrypt))
        .route("/v1/master-keys/rotate", post(handlers::rotate_master_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
