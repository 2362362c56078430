//! SQLite persistence for chats and reminders
//!
//! Thin async wrapper over a thread-safe connection. Handles are cheap to
//! clone and share one connection; statement access is serialized behind a
//! mutex so read-check/write-commit pairs in the same call cannot
//! interleave.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context, Result};
use chrono::TimeZone;
use log::debug;
use sqlite::State;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::features::reminders::{Chat, Reminder, ReminderKind};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    time_zone TEXT NOT NULL,
    stop_armed INTEGER NOT NULL DEFAULT 0,
    jitter_minutes INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS reminders (
    name TEXT PRIMARY KEY,
    chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    is_daily INTEGER NOT NULL,
    when_ts INTEGER NOT NULL,
    from_user TEXT NOT NULL,
    target_user TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_reminders_chat ON reminders(chat_id);
";

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<sqlite::ConnectionThreadSafe>>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply the
    /// schema. Parent directories are created for file-backed paths.
    pub async fn new(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating database directory for {path}"))?;
                }
            }
        }
        let conn = sqlite::Connection::open_thread_safe(path)
            .with_context(|| format!("opening database at {path}"))?;
        conn.execute("PRAGMA foreign_keys = ON;")?;
        conn.execute(SCHEMA)?;
        debug!("Database ready at {path}");
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fetch the chat, creating it with defaults on first interaction.
    pub async fn ensure_chat(&self, chat_id: i64, title: &str, time_zone: &str) -> Result<Chat> {
        if let Some(chat) = self.get_chat(chat_id).await? {
            return Ok(chat);
        }
        let chat = Chat {
            id: chat_id,
            title: title.to_string(),
            time_zone: time_zone.to_string(),
            stop_armed: false,
            jitter_minutes: 0,
        };
        {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare(
                "INSERT INTO chats (id, title, time_zone, stop_armed, jitter_minutes)
                 VALUES (?, ?, ?, 0, 0)",
            )?;
            stmt.bind((1, chat.id))?;
            stmt.bind((2, chat.title.as_str()))?;
            stmt.bind((3, chat.time_zone.as_str()))?;
            stmt.next()?;
        }
        debug!("Created chat {chat_id} ({title})");
        Ok(chat)
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<Option<Chat>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, title, time_zone, stop_armed, jitter_minutes FROM chats WHERE id = ?",
        )?;
        stmt.bind((1, chat_id))?;
        if stmt.next()? == State::Row {
            Ok(Some(read_chat(&stmt)?))
        } else {
            Ok(None)
        }
    }

    pub async fn all_chats(&self) -> Result<Vec<Chat>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT id, title, time_zone, stop_armed, jitter_minutes FROM chats")?;
        let mut chats = Vec::new();
        while stmt.next()? == State::Row {
            chats.push(read_chat(&stmt)?);
        }
        Ok(chats)
    }

    /// Returns whether the chat existed.
    pub async fn set_stop_armed(&self, chat_id: i64, armed: bool) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("UPDATE chats SET stop_armed = ? WHERE id = ?")?;
        stmt.bind((1, i64::from(armed)))?;
        stmt.bind((2, chat_id))?;
        stmt.next()?;
        Ok(conn.change_count() > 0)
    }

    /// Returns whether the chat existed.
    pub async fn set_jitter_minutes(&self, chat_id: i64, minutes: u32) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("UPDATE chats SET jitter_minutes = ? WHERE id = ?")?;
        stmt.bind((1, i64::from(minutes)))?;
        stmt.bind((2, chat_id))?;
        stmt.next()?;
        Ok(conn.change_count() > 0)
    }

    /// Delete the chat and, via the cascade, all its reminders.
    pub async fn delete_chat(&self, chat_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("DELETE FROM chats WHERE id = ?")?;
        stmt.bind((1, chat_id))?;
        stmt.next()?;
        Ok(conn.change_count() > 0)
    }

    pub async fn insert_reminder(&self, reminder: &Reminder) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO reminders (name, chat_id, is_daily, when_ts, from_user, target_user, subject)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, reminder.job_name().as_str()))?;
        stmt.bind((2, reminder.chat_id))?;
        stmt.bind((3, i64::from(reminder.kind == ReminderKind::Recurring)))?;
        stmt.bind((4, reminder.when.timestamp()))?;
        stmt.bind((5, reminder.from_user.as_str()))?;
        stmt.bind((6, reminder.target_user.as_str()))?;
        stmt.bind((7, reminder.subject.as_str()))?;
        stmt.next()?;
        Ok(())
    }

    pub async fn reminder_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT 1 FROM reminders WHERE name = ?")?;
        stmt.bind((1, name))?;
        Ok(stmt.next()? == State::Row)
    }

    /// Returns whether a row was deleted.
    pub async fn delete_reminder(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("DELETE FROM reminders WHERE name = ?")?;
        stmt.bind((1, name))?;
        stmt.next()?;
        Ok(conn.change_count() > 0)
    }

    /// All reminders of the chat, soonest first. Instants come back on the
    /// chat's own wall clock.
    pub async fn chat_reminders(&self, chat: &Chat) -> Result<Vec<Reminder>> {
        let tz = chat.tz();
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT is_daily, when_ts, from_user, target_user, subject
             FROM reminders WHERE chat_id = ? ORDER BY when_ts",
        )?;
        stmt.bind((1, chat.id))?;
        let mut reminders = Vec::new();
        while stmt.next()? == State::Row {
            let is_daily = stmt.read::<i64, _>("is_daily")? != 0;
            let when_ts = stmt.read::<i64, _>("when_ts")?;
            let Some(when) = tz.timestamp_opt(when_ts, 0).single() else {
                continue;
            };
            reminders.push(Reminder {
                chat_id: chat.id,
                kind: if is_daily {
                    ReminderKind::Recurring
                } else {
                    ReminderKind::OneShot
                },
                when,
                from_user: stmt.read::<String, _>("from_user")?,
                target_user: stmt.read::<String, _>("target_user")?,
                subject: stmt.read::<String, _>("subject")?,
            });
        }
        Ok(reminders)
    }

    /// Delete every one-shot reminder of the chat strictly before `now_ts`.
    /// Recurring reminders are never touched.
    pub async fn delete_expired_one_shots(&self, chat_id: i64, now_ts: i64) -> Result<usize> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "DELETE FROM reminders WHERE chat_id = ? AND is_daily = 0 AND when_ts < ?",
        )?;
        stmt.bind((1, chat_id))?;
        stmt.bind((2, now_ts))?;
        stmt.next()?;
        Ok(conn.change_count())
    }
}

fn read_chat(stmt: &sqlite::Statement<'_>) -> Result<Chat> {
    Ok(Chat {
        id: stmt.read::<i64, _>("id")?,
        title: stmt.read::<String, _>("title")?,
        time_zone: stmt.read::<String, _>("time_zone")?,
        stop_armed: stmt.read::<i64, _>("stop_armed")? != 0,
        jitter_minutes: stmt.read::<i64, _>("jitter_minutes")? as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono_tz::Tz;

    async fn db() -> Database {
        Database::new(":memory:").await.unwrap()
    }

    fn tz() -> Tz {
        "America/Los_Angeles".parse().unwrap()
    }

    #[tokio::test]
    async fn test_ensure_chat_is_idempotent() {
        let db = db().await;
        let a = db.ensure_chat(1, "pack", "America/Los_Angeles").await.unwrap();
        // A second ensure returns the stored row, not a fresh default.
        db.set_jitter_minutes(1, 15).await.unwrap();
        let b = db.ensure_chat(1, "renamed", "UTC").await.unwrap();
        assert_eq!(b.title, a.title);
        assert_eq!(b.jitter_minutes, 15);
    }

    #[tokio::test]
    async fn test_get_chat_missing() {
        let db = db().await;
        assert!(db.get_chat(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_armed_roundtrip() {
        let db = db().await;
        db.ensure_chat(1, "pack", "America/Los_Angeles").await.unwrap();
        assert!(db.set_stop_armed(1, true).await.unwrap());
        assert!(db.get_chat(1).await.unwrap().unwrap().stop_armed);
        assert!(db.set_stop_armed(1, false).await.unwrap());
        assert!(!db.get_chat(1).await.unwrap().unwrap().stop_armed);
        assert!(!db.set_stop_armed(404, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_reminder_roundtrip() {
        let db = db().await;
        let chat = db.ensure_chat(5, "pack", "America/Los_Angeles").await.unwrap();
        let when = tz().with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap();
        let reminder = Reminder::one_shot(5, when, "alice", "bob", "to check in");
        db.insert_reminder(&reminder).await.unwrap();

        assert!(db.reminder_exists(&reminder.job_name()).await.unwrap());
        let loaded = db.chat_reminders(&chat).await.unwrap();
        assert_eq!(loaded, vec![reminder.clone()]);

        assert!(db.delete_reminder(&reminder.job_name()).await.unwrap());
        assert!(!db.delete_reminder(&reminder.job_name()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_by_schema() {
        let db = db().await;
        db.ensure_chat(5, "pack", "America/Los_Angeles").await.unwrap();
        let when = tz().with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap();
        let reminder = Reminder::one_shot(5, when, "alice", "bob", "x");
        db.insert_reminder(&reminder).await.unwrap();
        assert!(db.insert_reminder(&reminder).await.is_err());
    }

    #[tokio::test]
    async fn test_reminders_sorted_by_when() {
        let db = db().await;
        let chat = db.ensure_chat(5, "pack", "America/Los_Angeles").await.unwrap();
        let base = tz().with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap();
        let later = Reminder::one_shot(5, base + Duration::hours(2), "a", "b", "second");
        let sooner = Reminder::one_shot(5, base, "a", "b", "first");
        db.insert_reminder(&later).await.unwrap();
        db.insert_reminder(&sooner).await.unwrap();
        let loaded = db.chat_reminders(&chat).await.unwrap();
        assert_eq!(loaded[0].subject, "first");
        assert_eq!(loaded[1].subject, "second");
    }

    #[tokio::test]
    async fn test_delete_chat_cascades() {
        let db = db().await;
        db.ensure_chat(5, "pack", "America/Los_Angeles").await.unwrap();
        let when = tz().with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap();
        let reminder = Reminder::one_shot(5, when, "alice", "bob", "x");
        db.insert_reminder(&reminder).await.unwrap();

        assert!(db.delete_chat(5).await.unwrap());
        assert!(!db.reminder_exists(&reminder.job_name()).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_purge_only_hits_past_one_shots() {
        let db = db().await;
        db.ensure_chat(5, "pack", "America/Los_Angeles").await.unwrap();
        let base = tz().with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap();
        let past = Reminder::one_shot(5, base - Duration::hours(1), "a", "b", "past");
        let exact = Reminder::one_shot(5, base, "a", "c", "on the dot");
        let daily = Reminder::recurring(5, base - Duration::days(30), "a");
        db.insert_reminder(&past).await.unwrap();
        db.insert_reminder(&exact).await.unwrap();
        db.insert_reminder(&daily).await.unwrap();

        let purged = db.delete_expired_one_shots(5, base.timestamp()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(!db.reminder_exists(&past.job_name()).await.unwrap());
        // A reminder firing exactly now is not expired.
        assert!(db.reminder_exists(&exact.job_name()).await.unwrap());
        assert!(db.reminder_exists(&daily.job_name()).await.unwrap());
    }
}
