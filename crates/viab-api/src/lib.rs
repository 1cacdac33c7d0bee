//! VIAB API crate - axum HTTP server for agent runs and image uploads.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod upload;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
