//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-identifier lock
//! registry that serializes load-mutate-save sequences.

use std::collections::HashMap;
use std::sync::Arc;

use habitchat_core::{ChatManager, HabitManager, PlanManager, SessionManager};
use tokio::sync::Mutex;

use crate::config::Config;

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionManager,
    pub habits: HabitManager,
    pub chat: ChatManager,
    pub plans: PlanManager,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        sessions: SessionManager,
        habits: HabitManager,
        chat: ChatManager,
        plans: PlanManager,
    ) -> Self {
        Self {
            config,
            sessions,
            habits,
            chat,
            plans,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the mutex serializing mutations for one identifier. Two tabs
    /// hammering the same account queue up here instead of overwriting each
    /// other's saves; different identifiers proceed in parallel.
    pub async fn lock_for(&self, identifier: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(identifier.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
