//! # Reminders Feature
//!
//! Natural-language reminder scheduling: a time/date phrase resolver, a
//! clause segmenter that pulls the schedule out of free-form text, and a
//! timer engine with idempotent job keys.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod assemble;
pub mod model;
pub mod resolve;
pub mod scheduler;
pub mod segment;

pub use assemble::{assemble, parse_reminder};
pub use model::{Chat, Reminder, ReminderError, ReminderKind, DEFAULT_TIME_ZONE};
pub use resolve::{resolve_date, resolve_time};
pub use scheduler::{chat_now, Notifier, SchedulingEngine};
pub use segment::{segment, Segmentation};
