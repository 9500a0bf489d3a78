//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, parse_kind)
//! - `import` - Spreadsheet import and export commands
//! - `serve` - Web server command
//! - `status` - Database status command
//! - `users` - User account commands

pub mod core;
pub mod import;
pub mod serve;
pub mod status;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use serve::*;
pub use status::*;
pub use users::*;
