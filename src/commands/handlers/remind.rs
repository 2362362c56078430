//! Reminder command handlers
//!
//! Handles: remind, remindme, listreminders, removereminder
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
use crate::features::reminders::{assemble, chat_now, resolve_time, Reminder, ReminderKind};

/// Handler for setting, listing, and removing reminders
pub struct RemindHandler;

#[async_trait]
impl ChatCommandHandler for RemindHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &[
            "remind",
            "remindme",
            "list",
            "listreminders",
            "removereminder",
        ]
    }

    async fn handle(&self, ctx: Arc<CommandContext>, request: &CommandRequest) -> Result<String> {
        match request.command.as_str() {
            "remind" | "remindme" => self.handle_remind(&ctx, request).await,
            "list" | "listreminders" => self.handle_list(&ctx, request).await,
            "removereminder" => self.handle_remove(&ctx, request).await,
            _ => Ok(replies::UNKNOWN_COMMAND.to_string()),
        }
    }
}

impl RemindHandler {
    /// Create a one-shot reminder from free-form text.
    ///
    /// `remindme` is `remind` with `me` injected as the addressee. The
    /// shortest well-formed input is four tokens (addressee, subject word,
    /// anchor, operand), so anything shorter skips parsing entirely.
    async fn handle_remind(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        let mut tokens = request.args.clone();
        if request.command == "remindme" {
            tokens.insert(0, "me".to_string());
        }
        if tokens.len() < 4 {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        }

        let chat = ctx.ensure_chat(request).await?;
        let now = chat_now(&chat);
        let reminder = match assemble(chat.id, &request.from_user, now, &tokens) {
            Ok(reminder) => reminder,
            Err(e) => return Ok(replies::for_error(&e).to_string()),
        };

        match ctx.engine.register(&chat, &reminder).await {
            Ok(name) => {
                info!(
                    "Set reminder {name} in chat {} for {}",
                    chat.id, reminder.target_user
                );
                Ok(replies::one_shot_set(&reminder.render(&now)))
            }
            Err(e) => Ok(replies::for_error(&e).to_string()),
        }
    }

    /// List the chat's reminders, dailies first, soonest first within each
    /// group. Expired one-shots are purged before reading.
    async fn handle_list(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        let Some(chat) = ctx.database.get_chat(request.chat_id).await? else {
            return Ok(replies::NO_REMINDERS.to_string());
        };
        ctx.engine.purge_expired(&chat).await?;
        let reminders = ctx.database.chat_reminders(&chat).await?;
        if reminders.is_empty() {
            return Ok(replies::NO_REMINDERS.to_string());
        }

        let now = chat_now(&chat);
        let mut out = String::new();
        let dailies: Vec<&Reminder> = reminders
            .iter()
            .filter(|r| r.kind == ReminderKind::Recurring)
            .collect();
        let one_shots: Vec<&Reminder> = reminders
            .iter()
            .filter(|r| r.kind == ReminderKind::OneShot)
            .collect();

        if !dailies.is_empty() {
            out.push_str("This chat has the following daily reminder messages set:\n");
            for reminder in &dailies {
                out.push_str(&reminder.render(&now));
                out.push('\n');
            }
        }
        if !one_shots.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("This chat has the following one-time reminders set:\n");
            for reminder in &one_shots {
                out.push_str(&reminder.render(&now));
                out.push('\n');
            }
        }
        Ok(out.trim_end().to_string())
    }

    /// Remove a one-shot reminder the requester is allowed to see.
    ///
    /// Arguments are an optional time phrase that filters by hour:minute
    /// plus an optional `#N` picking the Nth match. Without `#N` the
    /// matches are listed with their removal commands. Only the requester's
    /// own reminders (set by or aimed at them) are visible unless they pass
    /// the admin gate. Daily reminders go through `stopdailyreminder`.
    async fn handle_remove(&self, ctx: &CommandContext, request: &CommandRequest) -> Result<String> {
        let Some(chat) = ctx.database.get_chat(request.chat_id).await? else {
            return Ok(replies::CHAT_UNKNOWN.to_string());
        };
        let reminders = ctx.database.chat_reminders(&chat).await?;
        if reminders.is_empty() {
            return Ok(replies::NO_REMINDERS.to_string());
        }
        let now = chat_now(&chat);

        // Split the args into a time phrase and a trailing "#N" selector.
        // Accepts both "#2" and "# 2".
        let hash_index = request.args.iter().position(|a| a.starts_with('#'));
        let time_args = match hash_index {
            Some(i) => &request.args[..i],
            None => &request.args[..],
        };
        let mut selected: Option<usize> = None;
        if let Some(i) = hash_index {
            let digits = request.args[i].trim_start_matches('#');
            let parsed = if digits.is_empty() {
                request.args.get(i + 1).and_then(|a| a.parse().ok())
            } else {
                digits.parse().ok()
            };
            match parsed {
                Some(n) => selected = Some(n),
                None => return Ok(replies::NOT_FOUND.to_string()),
            }
        }

        let filter_time = resolve_time(&time_args.join(" "), now);
        if filter_time.is_none() && hash_index.is_none() && !request.args.is_empty() {
            return Ok(replies::CANNOT_PARSE_TIME.to_string());
        }

        use chrono::Timelike;
        let requester = request.from_user.to_lowercase();
        let mut candidates = 0usize;
        let mut visible: Vec<&Reminder> = Vec::new();
        for reminder in reminders
            .iter()
            .filter(|r| r.kind == ReminderKind::OneShot)
        {
            let matches = match filter_time {
                Some(t) => {
                    reminder.when.hour() == t.hour() && reminder.when.minute() == t.minute()
                }
                None => true,
            };
            if !matches {
                continue;
            }
            candidates += 1;
            if request.is_admin
                || requester == reminder.from_user.to_lowercase()
                || requester == reminder.target_user.to_lowercase()
            {
                visible.push(reminder);
            }
        }

        if candidates == 0 {
            return Ok(replies::NOT_FOUND.to_string());
        }
        if visible.is_empty() {
            return Ok(replies::PERMISSION_DENIED.to_string());
        }

        match selected {
            Some(n) => {
                let Some(reminder) = n.checked_sub(1).and_then(|i| visible.get(i)) else {
                    return Ok(replies::NOT_FOUND.to_string());
                };
                let name = reminder.job_name();
                ctx.engine.cancel(chat.id, &name).await?;
                info!("Removed reminder {name} from chat {}", chat.id);
                Ok(replies::removed(&reminder.render(&now)))
            }
            None => {
                let filter_suffix = if request.args.is_empty() {
                    ""
                } else {
                    " that match your search"
                };
                let mut out = format!("You can remove the following reminders{filter_suffix}:\n");
                let args = request.args.join(" ");
                for (i, reminder) in visible.iter().enumerate() {
                    let n = i + 1;
                    out.push_str(&format!("#{n}: {}\n", reminder.render(&now)));
                    if args.is_empty() {
                        out.push_str(&format!("    removereminder #{n}\n"));
                    } else {
                        out.push_str(&format!("    removereminder {args} #{n}\n"));
                    }
                }
                Ok(out.trim_end().to_string())
            }
        }
    }
}
