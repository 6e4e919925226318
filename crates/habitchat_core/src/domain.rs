//! crates/habitchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage backend; they derive serde
//! traits only because the export action and the file-backed store both
//! serialize whole records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Subscription tier. The tier determines the daily message allowance and
/// whether a plan change goes through the billing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Silver,
    Gold,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Silver => "silver",
            Plan::Gold => "gold",
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "silver" => Ok(Plan::Silver),
            "gold" => Ok(Plan::Gold),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a plan name the system does not know.
#[derive(Debug, thiserror::Error)]
#[error("unknown plan '{0}'")]
pub struct UnknownPlan(pub String);

/// Represents a single question-and-answer exchange in a user's
/// conversation log. The answer may be a human-readable placeholder when
/// the generation collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QAPair {
    pub question: String,
    pub answer: String,
}

/// Represents everything the system knows about one user, keyed by an
/// email-like identifier. The identifier is immutable after creation;
/// records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub identifier: String,
    pub plan: Plan,
    pub messages_used_today: u32,
    /// Local calendar date of the last interaction. When it differs from
    /// today, the daily counter is stale and must be reset.
    pub last_activity_date: NaiveDate,
    /// Ordered habit list. Duplicates are permitted; deletion is by index.
    pub habits: Vec<String>,
    pub conversation: Vec<QAPair>,
}

impl UserRecord {
    /// A fresh record for a first-seen identifier: free plan, zeroed
    /// counter, empty lists.
    pub fn new(identifier: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            plan: Plan::default(),
            messages_used_today: 0,
            last_activity_date: today,
            habits: Vec::new(),
            conversation: Vec::new(),
        }
    }
}
