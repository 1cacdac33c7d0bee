//! VIAB storage crate - SQLite persistence for agent runs and user memories.
//!
//! Provides a WAL-mode SQLite database with configurable table names,
//! migrations, and repositories for session storage and user memory.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::{Database, TableNames};
pub use repository::{MemoryRepository, RunRepository};
