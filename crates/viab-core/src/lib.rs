//! VIAB core crate - configuration, errors, identifiers, shared types.

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::ViabConfig;
pub use error::{Result, ViabError};
pub use ids::{generate_run_id, generate_session_id, generate_user_id};
pub use types::*;
