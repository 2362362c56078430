//! Chat lifecycle command handlers
//!
//! Handles: start, stopall, stopconfirm, help, remindexamples
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{ChatCommandHandler, CommandRequest};
use crate::core::replies;

/// Handler for chat setup/teardown and the static help texts
pub struct LifecycleHandler;

#[async_trait]
impl ChatCommandHandler for LifecycleHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "start",
            "stopall",
            "stopconfirm",
            "help",
            "remindexamples",
            "reminderexamples",
        ]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, request: &CommandRequest) -> Result<String> {
        match request.command.as_str() {
            "start" => {
                ctx.ensure_chat(request).await?;
                Ok(replies::GREETING.to_string())
            }
            "stopall" => self.handle_stopall(&ctx, request).await,
            "stopconfirm" => self.handle_stopconfirm(&ctx, request).await,
            "help" => Ok(replies::HELP.to_string()),
            "remindexamples" | "reminderexamples" => Ok(replies::EXAMPLES.to_string()),
            _ => Ok(replies::UNKNOWN_COMMAND.to_string()),
        }
    }
}

impl LifecycleHandler {
    /// First half of chat destruction: arm the confirmation latch.
    async fn handle_stopall(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        if !request.is_admin {
            return Ok(replies::ADMIN_ONLY.to_string());
        }
        if ctx.database.set_stop_armed(request.chat_id, true).await? {
            Ok(replies::STOP_ARMED.to_string())
        } else {
            Ok(replies::CHAT_UNKNOWN.to_string())
        }
    }

    /// Second half: only goes through while the latch is still armed.
    /// Any other message in between disarms it.
    async fn handle_stopconfirm(
        &self,
        ctx: &CommandContext,
        request: &CommandRequest,
    ) -> Result<String> {
        if !request.is_admin {
            return Ok(replies::ADMIN_ONLY.to_string());
        }
        let Some(chat) = ctx.database.get_chat(request.chat_id).await? else {
            return Ok(replies::CHAT_UNKNOWN.to_string());
        };
        if !chat.stop_armed {
            return Ok(replies::STOP_NOT_ARMED.to_string());
        }
        ctx.engine.cancel_chat(chat.id).await;
        ctx.database.delete_chat(chat.id).await?;
        info!("Deleted chat {} and all its reminders", chat.id);
        Ok(replies::STOPPED.to_string())
    }
}
