//! Per-command handler implementations
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial handlers (remind, daily, lifecycle)

pub mod daily;
pub mod lifecycle;
pub mod remind;

use std::sync::Arc;

use super::handler::ChatCommandHandler;

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn ChatCommandHandler>> {
    vec![
        Arc::new(remind::RemindHandler),
        Arc::new(daily::DailyHandler),
        Arc::new(lifecycle::LifecycleHandler),
    ]
}
