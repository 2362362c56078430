//! Chat command handler trait and infrastructure
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::context::CommandContext;

/// A parsed prefix command, already detached from the transport.
///
/// The gateway layer in `bin/bot.rs` builds one of these per command
/// message; handlers never see the transport types, which keeps them
/// testable without a live connection.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub chat_id: i64,
    pub chat_title: String,
    /// Display name of the sender.
    pub from_user: String,
    /// Whether the sender passes the chat's admin gate.
    pub is_admin: bool,
    /// Command name, lowercased, without the prefix.
    pub command: String,
    /// Whitespace-split tokens after the command name.
    pub args: Vec<String>,
}

/// Trait for chat command handlers
///
/// Each handler implements this trait to process one or more commands.
/// Handlers are registered with a CommandRegistry and dispatched based on
/// command name. The returned string is the reply sent back to the chat.
///
/// # Example
///
/// ```ignore
/// pub struct HelpHandler;
///
/// #[async_trait]
/// impl ChatCommandHandler for HelpHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["help"]
///     }
///
///     async fn handle(
///         &self,
///         _ctx: Arc<CommandContext>,
///         _request: &CommandRequest,
///     ) -> Result<String> {
///         Ok("here to help".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    ///
    /// A handler can process multiple commands if they share logic.
    fn command_names(&self) -> &'static [&'static str];

    /// Handle the command and produce the reply text
    async fn handle(&self, ctx: Arc<CommandContext>, request: &CommandRequest) -> Result<String>;
}
