//! Daily broadcast command handlers
//!
//! Handles: setdailyreminder, stopdailyreminder, setjitter
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
use crate::features::reminders::{chat_now, resolve_time, Reminder};

/// Largest accepted jitter setting. The doubled window stays within one day.
const MAX_JITTER_MINUTES: u32 = 720;

/// Handler for the admin-gated daily broadcast commands
pub struct DailyHandler;

#[async_trait]
impl ChatCommandHandler for DailyHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "setdaily",
            "setdailyreminder",
            "stopdaily",
            "stopdailyreminder",
            "setjitter",
        ]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, request: &CommandRequest) -> Result<String> {
        if !request.is_admin {
            return Ok(replies::ADMIN_ONLY.to_string());
        }
        match request.command.as_str() {
            "setdaily" | "setdailyreminder" => self.handle_set(&ctx, request).await,
            "stopdaily" | "stopdailyreminder" => self.handle_stop(&ctx, request).await,
            "setjitter" => self.handle_jitter(&ctx, request).await,
            _ => Ok(replies::UNKNOWN_COMMAND.to_string()),
        }
    }
}

impl DailyHandler {
    /// Add a recurring broadcast at the given time-of-day.
    async fn handle_set(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        if request.args.is_empty() {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        }
        let chat = ctx.ensure_chat(request).await?;
        let now = chat_now(&chat);
        let Some(when) = resolve_time(&request.args.join(" "), now) else {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        };
        let reminder = Reminder::recurring(chat.id, when, &request.from_user);
        match ctx.engine.register(&chat, &reminder).await {
            Ok(name) => {
                info!("Set daily reminder {name} in chat {}", chat.id);
                Ok(replies::daily_set(&reminder.render(&now)))
            }
            Err(e) => Ok(replies::for_error(&e).to_string()),
        }
    }

    /// Remove the recurring broadcast at the given time-of-day.
    ///
    /// The time phrase rebuilds the same idempotency key the set command
    /// produced, so no lookup by subject is ever needed.
    async fn handle_stop(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        if request.args.is_empty() {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        }
        let Some(chat) = ctx.database.get_chat(request.chat_id).await? else {
            return Ok(replies::NOT_FOUND.to_string());
        };
        let now = chat_now(&chat);
        let Some(when) = resolve_time(&request.args.join(" "), now) else {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        };
        let reminder = Reminder::recurring(chat.id, when, &request.from_user);
        if ctx.engine.cancel(chat.id, &reminder.job_name()).await? {
            Ok(replies::daily_removed(&reminder.render(&now)))
        } else {
            Ok(replies::NOT_FOUND.to_string())
        }
    }

    /// Configure the chat's jitter window for daily broadcasts.
    async fn handle_jitter(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        let Some(minutes) = request.args.first().and_then(|a| a.parse::<u32>().ok()) else {
            return Ok(replies::JITTER_USAGE.to_string());
        };
        if minutes > MAX_JITTER_MINUTES {
            return Ok(replies::JITTER_USAGE.to_string());
        }
        if ctx.database.set_jitter_minutes(request.chat_id, minutes).await? {
            info!("Set jitter to {minutes}m in chat {}", request.chat_id);
            Ok(replies::jitter_set(minutes))
        } else {
            Ok(replies::CHAT_UNKNOWN.to_string())
        }
    }
}
