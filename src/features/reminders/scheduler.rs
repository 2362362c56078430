//! Reminder scheduling engine
//!
//! Owns the live timer set: every armed reminder is a tokio task tracked
//! by its idempotency key. Registration is check-then-arm under a per-chat
//! lock so no key is ever armed twice; delivery goes through the
//! [`Notifier`] seam and is fire-and-log, never retried.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use log::{info, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::core::replies;
use crate::database::Database;

use super::model::{Chat, Reminder, ReminderError, ReminderKind};

/// Outbound notification seam. The engine never touches the chat transport
/// directly; the binary plugs in a gateway-backed implementation and tests
/// plug in a recording one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Current instant on the chat's wall clock, sub-second part dropped.
pub fn chat_now(chat: &Chat) -> DateTime<Tz> {
    let now = Utc::now().with_timezone(&chat.tz());
    now.with_nanosecond(0).unwrap_or(now)
}

/// Scheduling engine: registers, cancels, purges, and reloads reminder
/// timers. Cheap to clone; all clones share the timer set.
#[derive(Clone)]
pub struct SchedulingEngine {
    db: Database,
    notifier: Arc<dyn Notifier>,
    jobs: Arc<DashMap<String, JoinHandle<()>>>,
    chat_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl SchedulingEngine {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        SchedulingEngine {
            db,
            notifier,
            jobs: Arc::new(DashMap::new()),
            chat_locks: Arc::new(DashMap::new()),
        }
    }

    fn chat_lock(&self, chat_id: i64) -> Arc<Mutex<()>> {
        self.chat_locks.entry(chat_id).or_default().clone()
    }

    /// Whether a timer is currently armed under `name`.
    pub fn is_armed(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Keys of all currently armed timers.
    pub fn armed_names(&self) -> Vec<String> {
        self.jobs.iter().map(|e| e.key().clone()).collect()
    }

    /// Register and arm a reminder.
    ///
    /// The check-then-arm runs under the owning chat's lock: a reminder
    /// whose key already exists in storage or in the live timer set is
    /// rejected with [`ReminderError::Duplicate`] and nothing is armed.
    pub async fn register(&self, chat: &Chat, reminder: &Reminder) -> Result<String, ReminderError> {
        let name = reminder.job_name();
        let lock = self.chat_lock(chat.id);
        let _guard = lock.lock().await;

        let persisted = self
            .db
            .reminder_exists(&name)
            .await
            .map_err(|e| ReminderError::Scheduling(e.to_string()))?;
        if persisted || self.jobs.contains_key(&name) {
            return Err(ReminderError::Duplicate);
        }

        self.arm(chat, reminder, &name);
        if let Err(e) = self.db.insert_reminder(reminder).await {
            if let Some((_, handle)) = self.jobs.remove(&name) {
                handle.abort();
            }
            return Err(ReminderError::Scheduling(e.to_string()));
        }
        info!("Registered job: {name}");
        Ok(name)
    }

    /// Disarm any timer(s) under `name` and delete the persisted entry.
    /// Idempotent; returns whether anything was actually removed.
    pub async fn cancel(&self, chat_id: i64, name: &str) -> Result<bool> {
        let lock = self.chat_lock(chat_id);
        let _guard = lock.lock().await;
        let mut removed = false;
        for key in [name.to_string(), format!("{name}_jitter")] {
            if let Some((_, handle)) = self.jobs.remove(&key) {
                handle.abort();
                info!("Removing job: {key}");
                removed = true;
            }
        }
        let deleted = self.db.delete_reminder(name).await?;
        Ok(removed || deleted)
    }

    /// Disarm every timer belonging to `chat_id`. Persisted rows are the
    /// caller's concern (chat deletion cascades them).
    pub async fn cancel_chat(&self, chat_id: i64) {
        let prefix = format!("{chat_id}_");
        let keys: Vec<String> = self
            .jobs
            .iter()
            .filter(|e| e.key().starts_with(&prefix))
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            if let Some((_, handle)) = self.jobs.remove(&key) {
                handle.abort();
                info!("Removing job: {key}");
            }
        }
    }

    /// Delete every one-shot reminder of the chat whose instant has already
    /// passed, without firing it. Runs before listings and reloads.
    pub async fn purge_expired(&self, chat: &Chat) -> Result<usize> {
        let now = chat_now(chat);
        let purged = self
            .db
            .delete_expired_one_shots(chat.id, now.timestamp())
            .await?;
        if purged > 0 {
            info!("Purged {purged} expired reminder(s) from chat {}", chat.id);
        }
        Ok(purged)
    }

    /// Re-arm every persisted reminder at process start.
    ///
    /// Storage is the source of truth here and the timer set is cold, so
    /// the duplicate check is skipped. Also clears every chat's stop-armed
    /// flag and purges expired one-shots first.
    pub async fn reload(&self, chats: &[Chat]) -> Result<usize> {
        let mut armed = 0;
        for chat in chats {
            self.db.set_stop_armed(chat.id, false).await?;
            self.purge_expired(chat).await?;
            for reminder in self.db.chat_reminders(chat).await? {
                let name = reminder.job_name();
                info!("Re-arming job: {name}");
                self.arm(chat, &reminder, &name);
                armed += 1;
            }
        }
        Ok(armed)
    }

    fn arm(&self, chat: &Chat, reminder: &Reminder, name: &str) {
        let engine = self.clone();
        let handle = match reminder.kind {
            ReminderKind::OneShot => {
                let reminder = reminder.clone();
                let name = name.to_string();
                tokio::spawn(async move {
                    let delay = (reminder.when.with_timezone(&Utc) - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    tokio::time::sleep(delay).await;
                    engine.fire_one_shot(&reminder, &name).await;
                })
            }
            ReminderKind::Recurring => {
                let tz = chat.tz();
                let chat_id = chat.id;
                let (hour, minute) = (reminder.when.hour(), reminder.when.minute());
                let name = name.to_string();
                tokio::spawn(async move {
                    engine.run_recurring(tz, chat_id, hour, minute, name).await;
                })
            }
        };
        self.jobs.insert(name.to_string(), handle);
    }

    /// Deliver a one-shot notification and consume the reminder. A failed
    /// send is logged and the reminder is still deleted; a missed reminder
    /// is never re-attempted.
    async fn fire_one_shot(&self, reminder: &Reminder, name: &str) {
        let from = if reminder.from_user == reminder.target_user {
            "You"
        } else {
            reminder.from_user.as_str()
        };
        let text = replies::one_shot_notification(&reminder.target_user, from, &reminder.subject);
        if let Err(e) = self.notifier.deliver(reminder.chat_id, &text).await {
            warn!("Failed sending job {name}: {e}");
        }
        if let Err(e) = self.db.delete_reminder(name).await {
            warn!("Failed to delete fired reminder {name}: {e}");
        }
        self.jobs.remove(name);
    }

    /// 24-hour loop anchored at the configured time-of-day. Each firing
    /// either delivers directly or, when the chat has a jitter window,
    /// defers once through a secondary one-shot timer.
    async fn run_recurring(&self, tz: Tz, chat_id: i64, hour: u32, minute: u32, name: String) {
        loop {
            tokio::time::sleep(until_next_occurrence(tz, hour, minute)).await;
            let jitter_minutes = match self.db.get_chat(chat_id).await {
                Ok(Some(chat)) => chat.jitter_minutes,
                Ok(None) => return,
                Err(e) => {
                    warn!("Failed to look up chat {chat_id} for job {name}: {e}");
                    0
                }
            };
            if jitter_minutes > 0 {
                self.arm_jittered(chat_id, &name, jitter_minutes);
            } else {
                let engine = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.notifier.deliver(chat_id, replies::DAILY_BROADCAST).await
                    {
                        warn!("Failed sending daily broadcast to chat {chat_id}: {e}");
                    }
                });
            }
        }
    }

    /// Secondary one-shot delay for a recurring firing: uniform over a
    /// window twice the configured minutes, plus up to 59 extra seconds.
    /// The suffixed key keeps it distinct from the primary recurring timer,
    /// and the secondary firing never re-jitters.
    fn arm_jittered(&self, chat_id: i64, name: &str, jitter_minutes: u32) {
        let delay = {
            let mut rng = rand::rng();
            let minutes = rng.random_range(0..u64::from(jitter_minutes) * 2);
            let seconds = rng.random_range(0..60u64);
            Duration::from_secs(minutes * 60 + seconds)
        };
        let key = format!("{name}_jitter");
        info!("Delaying {name} by {}s", delay.as_secs());
        let engine = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = engine.notifier.deliver(chat_id, replies::DAILY_BROADCAST).await {
                warn!("Failed sending daily broadcast to chat {chat_id}: {e}");
            }
            engine.jobs.remove(&task_key);
        });
        if let Some(old) = self.jobs.insert(key, handle) {
            old.abort();
        }
    }
}

/// Time until the next chat-local occurrence of `hour:minute`. Falls back
/// to a flat day when the wall-clock time does not exist (DST gap).
fn until_next_occurrence(tz: Tz, hour: u32, minute: u32) -> Duration {
    let now = Utc::now().with_timezone(&tz);
    let today = tz
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
        .single();
    let next = match today {
        Some(t) if t > now => t,
        Some(t) => match t.checked_add_days(Days::new(1)) {
            Some(n) => n,
            None => return Duration::from_secs(86_400),
        },
        None => return Duration::from_secs(86_400),
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex as StdMutex;

    struct RecordingNotifier {
        sent: StdMutex<Vec<(i64, String)>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(RecordingNotifier {
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn deliver(&self, _chat_id: i64, _text: &str) -> Result<()> {
            anyhow::bail!("transport down")
        }
    }

    async fn engine_with(notifier: Arc<dyn Notifier>) -> (SchedulingEngine, Database) {
        let db = Database::new(":memory:").await.unwrap();
        (SchedulingEngine::new(db.clone(), notifier), db)
    }

    async fn test_chat(db: &Database) -> Chat {
        db.ensure_chat(42, "test chat", "America/Los_Angeles")
            .await
            .unwrap()
    }

    fn future_one_shot(chat: &Chat, minutes: i64) -> Reminder {
        let when = chat_now(chat) + ChronoDuration::minutes(minutes);
        Reminder::one_shot(chat.id, when, "alice", "bob", "to stretch")
    }

    #[tokio::test]
    async fn test_register_arms_and_persists() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let reminder = future_one_shot(&chat, 30);
        let name = engine.register(&chat, &reminder).await.unwrap();
        assert!(engine.is_armed(&name));
        assert!(db.reminder_exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let reminder = future_one_shot(&chat, 30);
        engine.register(&chat, &reminder).await.unwrap();
        assert_eq!(
            engine.register(&chat, &reminder).await,
            Err(ReminderError::Duplicate)
        );
        assert_eq!(engine.armed_names().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let reminder = future_one_shot(&chat, 30);
        let name = engine.register(&chat, &reminder).await.unwrap();

        assert!(engine.cancel(chat.id, &name).await.unwrap());
        assert!(!engine.is_armed(&name));
        assert!(!db.reminder_exists(&name).await.unwrap());
        // Cancelling a missing key is a no-op, not an error.
        assert!(!engine.cancel(chat.id, &name).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_spares_recurring_and_future() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let now = chat_now(&chat);

        let expired = Reminder::one_shot(
            chat.id,
            now - ChronoDuration::hours(2),
            "alice",
            "bob",
            "already gone",
        );
        let future = future_one_shot(&chat, 30);
        let daily = Reminder::recurring(chat.id, now - ChronoDuration::days(10), "alice");
        db.insert_reminder(&expired).await.unwrap();
        db.insert_reminder(&future).await.unwrap();
        db.insert_reminder(&daily).await.unwrap();

        assert_eq!(engine.purge_expired(&chat).await.unwrap(), 1);
        assert!(!db.reminder_exists(&expired.job_name()).await.unwrap());
        assert!(db.reminder_exists(&future.job_name()).await.unwrap());
        assert!(db.reminder_exists(&daily.job_name()).await.unwrap());
    }

    #[tokio::test]
    async fn test_reload_rearms_persisted_reminders() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let now = chat_now(&chat);

        let one_shot = future_one_shot(&chat, 45);
        let daily = Reminder::recurring(chat.id, now + ChronoDuration::minutes(5), "alice");
        db.insert_reminder(&one_shot).await.unwrap();
        db.insert_reminder(&daily).await.unwrap();
        db.set_stop_armed(chat.id, true).await.unwrap();

        let armed = engine.reload(&[chat.clone()]).await.unwrap();
        assert_eq!(armed, 2);
        let mut names = engine.armed_names();
        names.sort();
        let mut expected = vec![one_shot.job_name(), daily.job_name()];
        expected.sort();
        assert_eq!(names, expected);
        // Boot always disarms the stop latch.
        assert!(!db.get_chat(chat.id).await.unwrap().unwrap().stop_armed);
    }

    #[tokio::test]
    async fn test_reload_skips_expired_one_shots() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let now = chat_now(&chat);

        let expired = Reminder::one_shot(
            chat.id,
            now - ChronoDuration::minutes(5),
            "alice",
            "bob",
            "stale",
        );
        db.insert_reminder(&expired).await.unwrap();

        assert_eq!(engine.reload(&[chat.clone()]).await.unwrap(), 0);
        assert!(engine.armed_names().is_empty());
    }

    #[tokio::test]
    async fn test_fire_delivers_and_consumes() {
        let notifier = RecordingNotifier::new();
        let (engine, db) = engine_with(notifier.clone()).await;
        let chat = test_chat(&db).await;
        let reminder = future_one_shot(&chat, 30);
        let name = reminder.job_name();
        db.insert_reminder(&reminder).await.unwrap();

        engine.fire_one_shot(&reminder, &name).await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, chat.id);
        assert!(sent[0].1.contains("@bob"));
        assert!(sent[0].1.contains("to stretch"));
        assert!(!db.reminder_exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_fire_consumes_even_when_delivery_fails() {
        let (engine, db) = engine_with(Arc::new(FailingNotifier)).await;
        let chat = test_chat(&db).await;
        let reminder = future_one_shot(&chat, 30);
        let name = reminder.job_name();
        db.insert_reminder(&reminder).await.unwrap();

        engine.fire_one_shot(&reminder, &name).await;

        assert!(!db.reminder_exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_fire_uses_you_for_self_reminders() {
        let notifier = RecordingNotifier::new();
        let (engine, db) = engine_with(notifier.clone()).await;
        let chat = test_chat(&db).await;
        let when = chat_now(&chat) + ChronoDuration::minutes(10);
        let reminder = Reminder::one_shot(chat.id, when, "alice", "alice", "to hydrate");
        db.insert_reminder(&reminder).await.unwrap();

        engine.fire_one_shot(&reminder, &reminder.job_name()).await;

        let sent = notifier.sent();
        assert!(sent[0].1.contains("You asked me to remind you"));
    }

    #[tokio::test]
    async fn test_cancel_chat_disarms_all_keys() {
        let (engine, db) = engine_with(RecordingNotifier::new()).await;
        let chat = test_chat(&db).await;
        let other = db
            .ensure_chat(77, "other", "America/Los_Angeles")
            .await
            .unwrap();

        engine
            .register(&chat, &future_one_shot(&chat, 30))
            .await
            .unwrap();
        let kept = engine
            .register(&other, &future_one_shot(&other, 30))
            .await
            .unwrap();

        engine.cancel_chat(chat.id).await;
        assert_eq!(engine.armed_names(), vec![kept]);
    }
}
