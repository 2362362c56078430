//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;

use crate::database::Database;
use crate::features::reminders::{Chat, SchedulingEngine};

use super::handler::CommandRequest;

/// Shared context for all command handlers
///
/// Contains the core services needed by the command handlers:
/// - Database for chat and reminder persistence
/// - SchedulingEngine for timer registration
/// - Default time zone assigned to chats on first contact
#[derive(Clone)]
pub struct CommandContext {
    pub database: Database,
    pub engine: SchedulingEngine,
    pub default_time_zone: String,
}

impl CommandContext {
    /// Create a new CommandContext with the given services
    pub fn new(database: Database, engine: SchedulingEngine, default_time_zone: String) -> Self {
        Self {
            database,
            engine,
            default_time_zone,
        }
    }

    /// Fetch the requesting chat's row, creating it on first contact.
    pub async fn ensure_chat(&self, request: &CommandRequest) -> Result<Chat> {
        self.database
            .ensure_chat(request.chat_id, &request.chat_title, &self.default_time_zone)
            .await
    }
}
