//! # Command System
//!
//! Prefix command handling for chat messages.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial modular command structure (handler trait, context, registry)

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use handler::{ChatCommandHandler, CommandRequest};
pub use handlers::create_all_handlers;
pub use registry::CommandRegistry;
