//! VIAB UI crate - embedded chat page served from `/ui`.
//!
//! The page is a single HTML file with inline CSS and JavaScript, embedded
//! at compile time via `include_str!`.

pub mod chat;

pub use chat::CHAT_HTML;
