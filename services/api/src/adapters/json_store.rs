//! services/api/src/adapters/json_store.rs
//!
//! The local-file implementation of the `UserStore` port: one JSON document
//! keyed by identifier, rewritten in full on every save. A missing or
//! undecodable file reads as an empty store so a corrupt disk never takes
//! the whole process down.
//!
//! The on-disk form is versioned. Older files (version 1) predate the plan
//! and quota fields; they are upgraded once at load time instead of being
//! patched ad hoc on every access.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use habitchat_core::domain::{Plan, QAPair, UserRecord};
use habitchat_core::ports::{PortError, PortResult, UserStore};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 2;

//=========================================================================================
// On-Disk Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Default)]
struct StoreFile {
    #[serde(default = "version_before_tracking")]
    schema_version: u32,
    #[serde(default)]
    users: HashMap<String, StoredRecord>,
}

/// Files written before the version field existed are version 1.
fn version_before_tracking() -> u32 {
    1
}

/// The persisted shape of a record. Fields added after version 1 carry
/// serde defaults so old files deserialize cleanly; [`StoredRecord::into_domain`]
/// finishes the upgrade.
#[derive(Serialize, Deserialize, Clone)]
struct StoredRecord {
    identifier: String,
    #[serde(default)]
    plan: Plan,
    #[serde(default)]
    messages_used_today: u32,
    #[serde(default)]
    last_activity_date: Option<NaiveDate>,
    #[serde(default)]
    habits: Vec<String>,
    #[serde(default)]
    conversation: Vec<QAPair>,
}

impl StoredRecord {
    fn from_domain(record: &UserRecord) -> Self {
        Self {
            identifier: record.identifier.clone(),
            plan: record.plan,
            messages_used_today: record.messages_used_today,
            last_activity_date: Some(record.last_activity_date),
            habits: record.habits.clone(),
            conversation: record.conversation.clone(),
        }
    }

    /// A record with no activity date gets today's, which leaves its counter
    /// intact until the next real day rollover.
    fn into_domain(self, today: NaiveDate) -> UserRecord {
        UserRecord {
            identifier: self.identifier,
            plan: self.plan,
            messages_used_today: self.messages_used_today,
            last_activity_date: self.last_activity_date.unwrap_or(today),
            habits: self.habits,
            conversation: self.conversation,
        }
    }
}

/// One-shot upgrade of a just-loaded file to the current schema. Serde
/// defaults have already zero-filled the fields version 1 lacked; the
/// version stamp makes the upgrade visible in the file after the next save.
fn migrate(mut file: StoreFile) -> StoreFile {
    if file.schema_version < SCHEMA_VERSION {
        file.schema_version = SCHEMA_VERSION;
    }
    file
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A whole-file JSON adapter that implements the `UserStore` port.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Arc<RwLock<StoreFile>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file is missing or
    /// not valid JSON.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("failed to create data dir: {e}")))?;
        }

        let file = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<StoreFile>(&contents) {
                Ok(file) => migrate(file),
                Err(e) => {
                    warn!(
                        "store file {} is not valid JSON ({e}); starting empty",
                        path.display()
                    );
                    empty_store()
                }
            },
            Err(_) => empty_store(),
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(file)),
        })
    }

    async fn flush(&self, file: &StoreFile) -> PortResult<()> {
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to write store file: {e}")))
    }
}

fn empty_store() -> StoreFile {
    StoreFile {
        schema_version: SCHEMA_VERSION,
        users: HashMap::new(),
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for JsonFileStore {
    async fn load(&self, identifier: &str) -> PortResult<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(identifier)
            .cloned()
            .map(|stored| stored.into_domain(Local::now().date_naive())))
    }

    async fn save(&self, record: &UserRecord) -> PortResult<()> {
        let mut state = self.state.write().await;
        state
            .users
            .insert(record.identifier.clone(), StoredRecord::from_domain(record));
        self.flush(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> UserRecord {
        let mut record = UserRecord::new("a@x.com", "2026-08-07".parse().unwrap());
        record.plan = Plan::Silver;
        record.habits.push("Exercise".to_string());
        record.conversation.push(QAPair {
            question: "Capital of France?".to_string(),
            answer: "Paris".to_string(),
        });
        record
    }

    #[tokio::test]
    async fn a_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("users.json"))
            .await
            .unwrap();
        assert!(store.load("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn a_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.load("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_records_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let record = sample_record();
        store.save(&record).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let loaded = reopened.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn version_1_files_are_upgraded_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        // A pre-versioning file: no schema_version, records missing the
        // plan/quota fields added later.
        let old = serde_json::json!({
            "users": {
                "a@x.com": {
                    "identifier": "a@x.com",
                    "habits": ["Read"],
                    "conversation": []
                }
            }
        });
        tokio::fs::write(&path, old.to_string()).await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let loaded = store.load("a@x.com").await.unwrap().unwrap();
        assert_eq!(loaded.plan, Plan::Free);
        assert_eq!(loaded.messages_used_today, 0);
        assert_eq!(loaded.habits, vec!["Read"]);

        // The next save stamps the current version into the file.
        store.save(&loaded).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
    }
}
