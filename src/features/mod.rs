// Features layer - all feature modules
pub mod reminders;

// Re-export commonly used items
pub use reminders::{Chat, Reminder, ReminderError, ReminderKind, SchedulingEngine};
