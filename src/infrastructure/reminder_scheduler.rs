use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Reminder {
    pub interval_id: String,
    pub fire_at: DateTime<Utc>,
}

pub trait ReminderScheduler: Send + Sync {
    /// Replaces any reminder already scheduled for `interval_id`.
    fn schedule(&self, interval_id: &str, fire_at: DateTime<Utc>) -> Result<(), InfraError>;
    fn cancel(&self, interval_id: &str) -> Result<bool, InfraError>;
    fn pending(&self) -> Result<Vec<Reminder>, InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryReminderScheduler {
    reminders: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryReminderScheduler {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, DateTime<Utc>>>, InfraError> {
        self.reminders.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("reminder scheduler lock poisoned: {error}"))
        })
    }

    fn normalized_id(interval_id: &str) -> Option<String> {
        let normalized = interval_id.trim();
        if normalized.is_empty() {
            return None;
        }
        Some(normalized.to_string())
    }
}

impl ReminderScheduler for InMemoryReminderScheduler {
    fn schedule(&self, interval_id: &str, fire_at: DateTime<Utc>) -> Result<(), InfraError> {
        let interval_id = Self::normalized_id(interval_id).ok_or_else(|| {
            InfraError::InvalidInput("interval id is required for a reminder".to_string())
        })?;
        self.lock()?.insert(interval_id, fire_at);
        Ok(())
    }

    fn cancel(&self, interval_id: &str) -> Result<bool, InfraError> {
        let Some(interval_id) = Self::normalized_id(interval_id) else {
            return Ok(false);
        };
        Ok(self.lock()?.remove(&interval_id).is_some())
    }

    fn pending(&self) -> Result<Vec<Reminder>, InfraError> {
        let mut reminders = self
            .lock()?
            .iter()
            .map(|(interval_id, fire_at)| Reminder {
                interval_id: interval_id.clone(),
                fire_at: *fire_at,
            })
            .collect::<Vec<_>>();
        reminders.sort_by(|left, right| {
            left.fire_at
                .cmp(&right.fire_at)
                .then_with(|| left.interval_id.cmp(&right.interval_id))
        });
        Ok(reminders)
    }
}
