//! User-facing reply catalog
//!
//! Every string the bot sends lives here so the command handlers stay
//! logic-only.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use crate::features::reminders::ReminderError;

pub const CANNOT_PARSE_TIME: &str =
    "I couldn't find a time in that. Try `at 2pm`, `at 14:30`, or `in 20 minutes`.";
pub const NO_SUBJECT: &str = "What should I remind about? Add something like `to drink water`.";
pub const IN_PAST: &str = "That time is in the past. I can't help you there.";
pub const TOO_FAR_OUT: &str = "That's more than a year away. I can only plan 365 days ahead.";
pub const TOO_CLOSE: &str = "That's less than a minute away. Just do the thing.";
pub const ALREADY_EXISTS: &str = "A reminder for that exact time already exists.";
pub const CANT_SCHEDULE: &str = "I couldn't schedule that reminder. Try again in a moment.";
pub const NOT_FOUND: &str = "I couldn't find a reminder matching that.";
pub const PERMISSION_DENIED: &str =
    "Only the person who set a reminder, its target, or an admin can remove it.";
pub const ADMIN_ONLY: &str = "Only chat admins can do that.";
pub const NO_REMINDERS: &str = "No reminders set for this chat.";
pub const CHAT_UNKNOWN: &str = "I don't know this chat yet. Say `start` first.";
pub const STOP_ARMED: &str =
    "This will delete every reminder in this chat. Send `stopconfirm` to go through with it.";
pub const STOP_NOT_ARMED: &str = "Nothing to confirm. Send `stopall` first.";
pub const STOPPED: &str = "All reminders deleted. Goodbye!";
pub const GREETING: &str =
    "Hello! I set reminders. Try `remindme to stretch in 20 minutes`, or `help` for the full list.";
pub const DAILY_BROADCAST: &str = "Daily reminder! Awoooo!";
pub const UNKNOWN_COMMAND: &str = "I don't know that command. Try `help`.";
pub const JITTER_USAGE: &str = "Usage: `setjitter <minutes>` (0 to 720; 0 turns jitter off).";

pub const HELP: &str = "\
Commands:
  remind <who> <what> <when> - set a reminder for someone
  remindme <what> <when> - set a reminder for yourself
  listreminders - list this chat's reminders
  removereminder [time] [#N] - remove a reminder you can see
  setdailyreminder <time> - (admin) add a daily broadcast
  stopdailyreminder <time> - (admin) remove a daily broadcast
  setjitter <minutes> - (admin) randomize daily broadcast times
  start - introduce me to this chat
  stopall - delete this chat and all its reminders (asks to confirm)
  remindexamples - example phrasings";

pub const EXAMPLES: &str = "\
Examples:
  remindme to drink some water at 2pm
  remindme to do a little dance in 5 minutes
  remind @sleepy to wake up at 0630 tomorrow
  remind me that the rent is due on the 1st at 9am
  remindme to vote on 11/5 at 8:00 a.m.";

/// Body of a fired one-shot notification.
pub fn one_shot_notification(target: &str, from: &str, subject: &str) -> String {
    format!("@{target}! {from} asked me to remind you {subject}.")
}

pub fn one_shot_set(rendered: &str) -> String {
    format!("Okay! Reminder set for {rendered}.")
}

pub fn daily_set(rendered: &str) -> String {
    format!("Daily reminder added at {rendered}.")
}

pub fn daily_removed(rendered: &str) -> String {
    format!("Daily reminder at {rendered} removed.")
}

pub fn removed(rendered: &str) -> String {
    format!("Removed the reminder for {rendered}.")
}

pub fn jitter_set(minutes: u32) -> String {
    if minutes == 0 {
        "Jitter turned off. Daily broadcasts fire exactly on time.".to_string()
    } else {
        format!(
            "Daily broadcasts will now wander up to {} minutes.",
            u64::from(minutes) * 2
        )
    }
}

/// Map a validation/scheduling error to its user-facing line.
pub fn for_error(err: &ReminderError) -> &'static str {
    match err {
        ReminderError::NeedAnchor => CANNOT_PARSE_TIME,
        ReminderError::NoSubject => NO_SUBJECT,
        ReminderError::InPast => IN_PAST,
        ReminderError::TooFarOut => TOO_FAR_OUT,
        ReminderError::TooClose => TOO_CLOSE,
        ReminderError::Duplicate => ALREADY_EXISTS,
        ReminderError::Scheduling(_) => CANT_SCHEDULE,
    }
}
