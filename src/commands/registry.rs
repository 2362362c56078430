//! Command name dispatch table
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::ChatCommandHandler;

/// Dispatch table from command names to their handlers.
///
/// A handler claims every name it answers to, so aliases such as `remind`
/// and `remindme` fan out to the same handler instance.
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn ChatCommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under every name it declares.
    pub fn register(&mut self, handler: Arc<dyn ChatCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    /// Look up the handler for a command name, if one is registered.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Number of registered names. Aliases count separately.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
