//! Reminder assembly and validation
//!
//! Combines the clause segmenter and resolvers into a validated one-shot
//! [`Reminder`], normalizing the target user and applying the policy
//! windows (past / too far out / too close).
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use super::model::{Reminder, ReminderError};
use super::segment::segment;

/// Parse tokens into an unvalidated one-shot reminder.
///
/// Token 0 is the addressee: `me` (any case) resolves to the requester,
/// anything else has a leading `@` sigil stripped. Returns `None` when no
/// `at` or `in` clause completes.
pub fn parse_reminder(
    chat_id: i64,
    from_user: &str,
    now: DateTime<Tz>,
    tokens: &[String],
) -> Option<Reminder> {
    let addressee = tokens.first()?;
    let seg = segment(tokens, now)?;
    let target_user = if addressee.eq_ignore_ascii_case("me") {
        from_user.to_string()
    } else {
        addressee.trim_start_matches('@').to_string()
    };
    Some(Reminder::one_shot(
        chat_id,
        seg.when,
        from_user,
        target_user,
        seg.subject,
    ))
}

/// Parse and validate. First failure wins, in order: no anchor, empty
/// subject, in the past, more than 365 days out, less than a minute away.
pub fn assemble(
    chat_id: i64,
    from_user: &str,
    now: DateTime<Tz>,
    tokens: &[String],
) -> Result<Reminder, ReminderError> {
    let reminder =
        parse_reminder(chat_id, from_user, now, tokens).ok_or(ReminderError::NeedAnchor)?;
    if reminder.subject.is_empty() {
        return Err(ReminderError::NoSubject);
    }
    if reminder.when < now {
        return Err(ReminderError::InPast);
    }
    if reminder.when > now + Duration::days(365) {
        return Err(ReminderError::TooFarOut);
    }
    if reminder.when - now < Duration::minutes(1) {
        return Err(ReminderError::TooClose);
    }
    Ok(reminder)
}
