//! Local workout reminders. Fire-and-forget; the tracking state machine
//! never waits on them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fire_at: OffsetDateTime,
}

impl Reminder {
    pub fn new(title: impl Into<String>, body: impl Into<String>, fire_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            fire_at,
        }
    }
}

pub trait ReminderScheduler: Send + Sync {
    fn schedule(&self, reminder: &Reminder);
    fn cancel(&self, reminder_id: Uuid);
}

/// Scheduler that only logs; used where no platform notifier exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReminderScheduler;

impl ReminderScheduler for LoggingReminderScheduler {
    fn schedule(&self, reminder: &Reminder) {
        tracing::info!(
            reminder = %reminder.id,
            fire_at = %reminder.fire_at,
            "Scheduled reminder: {}",
            reminder.title
        );
    }

    fn cancel(&self, reminder_id: Uuid) {
        tracing::info!(reminder = %reminder_id, "Cancelled reminder");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_reminder_serializes_fire_time() {
        let reminder = Reminder::new(
            "Long run",
            "18 km easy",
            datetime!(2024-05-04 06:30 UTC),
        );
        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["fire_at"], "2024-05-04T06:30:00Z");
        assert_ne!(reminder.id, Reminder::new("a", "b", reminder.fire_at).id);

        LoggingReminderScheduler.schedule(&reminder);
        LoggingReminderScheduler.cancel(reminder.id);
    }
}
