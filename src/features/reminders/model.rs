//! Reminder domain types
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;

/// Fallback zone for chats created before a timezone was ever configured.
pub const DEFAULT_TIME_ZONE: &str = "America/Los_Angeles";

/// A chat the bot participates in.
///
/// Chats are created on first interaction and destroyed by the two-step
/// stopall/stopconfirm flow. `stop_armed` is the confirmation latch; any
/// other activity in the chat disarms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    /// IANA zone name, e.g. "America/Los_Angeles".
    pub time_zone: String,
    pub stop_armed: bool,
    /// Random delay window (minutes) applied to recurring firings. 0 = off.
    pub jitter_minutes: u32,
}

impl Chat {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Chat {
            id,
            title: title.into(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            stop_armed: false,
            jitter_minutes: 0,
        }
    }

    /// Resolve the chat's IANA zone name, falling back to the default
    /// when the stored name is unparsable.
    pub fn tz(&self) -> Tz {
        self.time_zone
            .parse()
            .unwrap_or(chrono_tz::America::Los_Angeles)
    }
}

/// The two reminder kinds: daily broadcast vs. single future notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Recurring,
    OneShot,
}

/// A scheduled reminder.
///
/// `target_user` and `subject` are populated exactly when the kind is
/// OneShot; recurring reminders carry neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub chat_id: i64,
    pub kind: ReminderKind,
    /// Chat-local wall-clock instant.
    pub when: DateTime<Tz>,
    pub from_user: String,
    pub target_user: String,
    pub subject: String,
}

impl Reminder {
    /// A daily broadcast anchored at `when`'s time-of-day.
    pub fn recurring(chat_id: i64, when: DateTime<Tz>, from_user: impl Into<String>) -> Self {
        Reminder {
            chat_id,
            kind: ReminderKind::Recurring,
            when,
            from_user: from_user.into(),
            target_user: String::new(),
            subject: String::new(),
        }
    }

    /// A single notification for `target_user` about `subject`.
    pub fn one_shot(
        chat_id: i64,
        when: DateTime<Tz>,
        from_user: impl Into<String>,
        target_user: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Reminder {
            chat_id,
            kind: ReminderKind::OneShot,
            when,
            from_user: from_user.into(),
            target_user: target_user.into(),
            subject: subject.into(),
        }
    }

    /// Deterministic idempotency key for the scheduled job.
    ///
    /// Recurring reminders collapse per chat and wall-clock time-of-day;
    /// one-shots are unique per chat, requester, and minute-resolution
    /// timestamp. Seconds never participate.
    pub fn job_name(&self) -> String {
        match self.kind {
            ReminderKind::Recurring => {
                format!("{}_{}_{}", self.chat_id, self.when.hour(), self.when.minute())
            }
            ReminderKind::OneShot => format!(
                "{}_{}_{}_{}_{}_{}",
                self.chat_id,
                self.from_user,
                self.when.month(),
                self.when.day(),
                self.when.hour(),
                self.when.minute()
            ),
        }
    }

    /// Human-readable rendering for listings and confirmations.
    ///
    /// Recurring: `HH:MM`. OneShot: `MM/DD[/YY] @ hh:mm AM/PM for <target>:
    /// <subject>`, with the two-digit year shown only when it differs from
    /// `now`'s.
    pub fn render(&self, now: &DateTime<Tz>) -> String {
        match self.kind {
            ReminderKind::Recurring => self.when.format("%H:%M").to_string(),
            ReminderKind::OneShot => {
                let date = if self.when.year() == now.year() {
                    self.when.format("%m/%d").to_string()
                } else {
                    self.when.format("%m/%d/%y").to_string()
                };
                format!(
                    "{} @ {} for {}: {}",
                    date,
                    self.when.format("%I:%M %p"),
                    self.target_user,
                    self.subject
                )
            }
        }
    }
}

/// Failures produced while assembling or scheduling a reminder.
///
/// All variants are surfaced to the user as chat replies; none of them is
/// fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// No `at` or `in` clause could be completed from the input.
    NeedAnchor,
    /// Every token was claimed by a clause; nothing left for a subject.
    NoSubject,
    /// Resolved instant is strictly before now.
    InPast,
    /// Resolved instant is more than 365 days out.
    TooFarOut,
    /// Resolved instant is less than one minute away.
    TooClose,
    /// A reminder with the same idempotency key is already scheduled.
    Duplicate,
    /// The timer subsystem refused the registration.
    Scheduling(String),
}

impl std::fmt::Display for ReminderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderError::NeedAnchor => write!(f, "no at/in clause found"),
            ReminderError::NoSubject => write!(f, "reminder has no subject"),
            ReminderError::InPast => write!(f, "reminder is in the past"),
            ReminderError::TooFarOut => write!(f, "reminder is more than a year out"),
            ReminderError::TooClose => write!(f, "reminder is less than a minute away"),
            ReminderError::Duplicate => write!(f, "reminder already exists"),
            ReminderError::Scheduling(e) => write!(f, "scheduling failed: {e}"),
        }
    }
}

impl std::error::Error for ReminderError {}
