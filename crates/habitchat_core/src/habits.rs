//! crates/habitchat_core/src/habits.rs
//!
//! Ordered habit-list CRUD, scoped to one identifier. Every successful
//! mutation is persisted before it becomes visible to the caller.

use std::sync::Arc;

use crate::domain::UserRecord;
use crate::ports::{PortError, PortResult, UserStore};

pub struct HabitManager {
    store: Arc<dyn UserStore>,
}

impl HabitManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Appends a habit. Blank text is a validation rejection with no state
    /// change. Duplicates are allowed; there is no de-duplication.
    pub async fn add_habit(&self, record: &mut UserRecord, text: &str) -> PortResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PortError::Validation(
                "habit text must not be empty".to_string(),
            ));
        }
        record.habits.push(text.to_string());
        self.store.save(record).await
    }

    /// Removes the habit at `index`. Deletion is by position so duplicate
    /// habit strings stay unambiguous.
    pub async fn delete_habit(&self, record: &mut UserRecord, index: usize) -> PortResult<()> {
        if index >= record.habits.len() {
            return Err(PortError::Validation(format!("no habit at index {index}")));
        }
        record.habits.remove(index);
        self.store.save(record).await
    }
}
