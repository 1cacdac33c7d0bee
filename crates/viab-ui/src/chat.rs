//! Chat page embedding.
//!
//! The page drives the three agents through `POST /runs`:
//!
//! - **Sidebar**: user id, session id, floor plan upload (png, jpg, jpeg,
//!   pdf) and a "Generate BOQ" button
//! - **Chat pane**: conversation with the interview agent, streamed as the
//!   reply arrives
//!
//! Uploading a plan sends it to the visualizer agent. "Generate BOQ" sends the
//! conversation and the latest plan analysis to the BOQ agent.

/// The complete self-contained chat HTML.
pub const CHAT_HTML: &str = include_str!("../assets/chat.html");
