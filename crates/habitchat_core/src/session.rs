//! crates/habitchat_core/src/session.rs
//!
//! Resolves an identifier to a current-day-consistent user record: first
//! sight creates a default record, and a stale `last_activity_date` triggers
//! the daily quota reset.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::domain::UserRecord;
use crate::ports::{PortResult, UserStore};

pub struct SessionManager {
    store: Arc<dyn UserStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Loads the record for `identifier`, creating it on first sight and
    /// applying the daily reset. Store failures propagate; the caller cannot
    /// proceed without a resolvable record.
    pub async fn resolve(&self, identifier: &str) -> PortResult<UserRecord> {
        self.resolve_at(identifier, Local::now().date_naive()).await
    }

    async fn resolve_at(&self, identifier: &str, today: NaiveDate) -> PortResult<UserRecord> {
        let mut record = match self.store.load(identifier).await? {
            Some(record) => record,
            None => {
                let record = UserRecord::new(identifier, today);
                self.store.save(&record).await?;
                record
            }
        };

        if apply_daily_reset(&mut record, today) {
            self.store.save(&record).await?;
        }

        Ok(record)
    }
}

/// Zeroes the daily counter exactly when the calendar day has rolled over.
/// The counter reset and the date update happen together as one unit.
/// Returns whether the record changed.
pub fn apply_daily_reset(record: &mut UserRecord, today: NaiveDate) -> bool {
    if record.last_activity_date == today {
        return false;
    }
    record.messages_used_today = 0;
    record.last_activity_date = today;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Plan;
    use crate::test_support::MemoryStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn first_sight_creates_a_default_record() {
        let store = Arc::new(MemoryStore::default());
        let sessions = SessionManager::new(store.clone());

        let record = sessions
            .resolve_at("a@x.com", date("2026-08-07"))
            .await
            .unwrap();

        assert_eq!(record.identifier, "a@x.com");
        assert_eq!(record.plan, Plan::Free);
        assert_eq!(record.messages_used_today, 0);
        assert!(record.habits.is_empty());
        assert!(record.conversation.is_empty());

        // The new record must already be persisted.
        assert!(store.load("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_date_resets_the_counter_and_persists() {
        let store = Arc::new(MemoryStore::default());
        let sessions = SessionManager::new(store.clone());

        let mut record = UserRecord::new("a@x.com", date("2026-08-06"));
        record.messages_used_today = 17;
        store.save(&record).await.unwrap();

        let resolved = sessions
            .resolve_at("a@x.com", date("2026-08-07"))
            .await
            .unwrap();
        assert_eq!(resolved.messages_used_today, 0);
        assert_eq!(resolved.last_activity_date, date("2026-08-07"));

        let persisted = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(persisted.messages_used_today, 0);
        assert_eq!(persisted.last_activity_date, date("2026-08-07"));
    }

    #[tokio::test]
    async fn same_day_resolve_leaves_the_counter_alone() {
        let store = Arc::new(MemoryStore::default());
        let sessions = SessionManager::new(store.clone());

        let mut record = UserRecord::new("a@x.com", date("2026-08-07"));
        record.messages_used_today = 5;
        store.save(&record).await.unwrap();

        let resolved = sessions
            .resolve_at("a@x.com", date("2026-08-07"))
            .await
            .unwrap();
        assert_eq!(resolved.messages_used_today, 5);
    }

    #[test]
    fn reset_is_a_no_op_for_todays_date() {
        let mut record = UserRecord::new("a@x.com", date("2026-08-07"));
        record.messages_used_today = 3;
        assert!(!apply_daily_reset(&mut record, date("2026-08-07")));
        assert_eq!(record.messages_used_today, 3);
    }
}
