//! Identifier generation for users, sessions, and runs.
//!
//! User and session identifiers are the first 8 characters of a random
//! UUID v4. Those characters are always hex digits (the first UUID group),
//! so the result is a prefix of the UUID's dash-free hex form. Only 32 bits
//! of randomness survive the truncation; see `generate_run_id` for a
//! collision-resistant token.

use rand::Rng;
use uuid::Uuid;

/// Length of short user/session identifiers.
pub const SHORT_ID_LEN: usize = 8;

fn short_uuid() -> String {
    let mut id = Uuid::new_v4().to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

/// Generate a short user identifier.
pub fn generate_user_id() -> String {
    short_uuid()
}

/// Generate a short session identifier.
pub fn generate_session_id() -> String {
    short_uuid()
}

/// Generate a 32-character hex run identifier (128 random bits).
pub fn generate_run_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}
