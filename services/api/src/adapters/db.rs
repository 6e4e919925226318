//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `UserStore` port from the `core` crate. It keeps
//! one row per identifier in a PostgreSQL table, with the ordered habit and
//! conversation lists JSON-encoded into text columns.

use async_trait::async_trait;
use chrono::NaiveDate;
use habitchat_core::domain::{Plan, QAPair, UserRecord};
use habitchat_core::ports::{PortError, PortResult, UserStore};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UserStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the backing table when pointed at a fresh database.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                identifier TEXT PRIMARY KEY,
                plan TEXT NOT NULL,
                messages_used_today INTEGER NOT NULL,
                last_activity_date DATE NOT NULL,
                habits TEXT NOT NULL,
                conversation TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    identifier: String,
    plan: String,
    messages_used_today: i32,
    last_activity_date: NaiveDate,
    habits: String,
    conversation: String,
}

impl UserRow {
    fn to_domain(self) -> PortResult<UserRecord> {
        let plan = self
            .plan
            .parse::<Plan>()
            .map_err(|e| PortError::Unexpected(format!("bad plan column: {e}")))?;
        let habits: Vec<String> = serde_json::from_str(&self.habits)
            .map_err(|e| PortError::Unexpected(format!("bad habits column: {e}")))?;
        let conversation: Vec<QAPair> = serde_json::from_str(&self.conversation)
            .map_err(|e| PortError::Unexpected(format!("bad conversation column: {e}")))?;
        Ok(UserRecord {
            identifier: self.identifier,
            plan,
            messages_used_today: self.messages_used_today.max(0) as u32,
            last_activity_date: self.last_activity_date,
            habits,
            conversation,
        })
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn load(&self, identifier: &str) -> PortResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT identifier, plan, messages_used_today, last_activity_date, habits, conversation
             FROM users WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        row.map(UserRow::to_domain).transpose()
    }

    async fn save(&self, record: &UserRecord) -> PortResult<()> {
        let habits = serde_json::to_string(&record.habits)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let conversation = serde_json::to_string(&record.conversation)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO users (identifier, plan, messages_used_today, last_activity_date, habits, conversation)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (identifier) DO UPDATE SET
                plan = EXCLUDED.plan,
                messages_used_today = EXCLUDED.messages_used_today,
                last_activity_date = EXCLUDED.last_activity_date,
                habits = EXCLUDED.habits,
                conversation = EXCLUDED.conversation",
        )
        .bind(&record.identifier)
        .bind(record.plan.as_str())
        .bind(record.messages_used_today as i32)
        .bind(record.last_activity_date)
        .bind(habits)
        .bind(conversation)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(())
    }
}
