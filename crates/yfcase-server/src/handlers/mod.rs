//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod auth;
pub mod cases;
pub mod export;
pub mod import;
pub mod reference;

// Re-export all handlers for use in router
pub use audit::*;
pub use auth::*;
pub use cases::*;
pub use export::*;
pub use import::*;
pub use reference::*;
