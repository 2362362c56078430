//! # Core Module
//!
//! Configuration and the user-facing reply catalog for the reminder bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial creation with config and replies modules

pub mod config;
pub mod replies;

// Re-export commonly used items
pub use config::Config;
