//! Shared fakes for the manager unit tests: an in-memory store and canned
//! collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Plan, UserRecord};
use crate::ports::{PaymentService, PortError, PortResult, TextGenerationService, UserStore};

/// A fixed "today" so tests never depend on the wall clock.
pub fn today() -> NaiveDate {
    "2026-08-07".parse().unwrap()
}

/// In-memory `UserStore`.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, UserRecord>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn load(&self, identifier: &str) -> PortResult<Option<UserRecord>> {
        Ok(self.records.lock().unwrap().get(identifier).cloned())
    }

    async fn save(&self, record: &UserRecord) -> PortResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.identifier.clone(), record.clone());
        Ok(())
    }
}

/// A generator that returns one fixed answer and counts its calls.
pub struct FixedGenerator {
    answer: String,
    calls: AtomicUsize,
}

impl FixedGenerator {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerationService for FixedGenerator {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// A generator whose every call fails mid-flight.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerationService for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        Err(PortError::Collaborator("boom".to_string()))
    }
}

/// A generator standing in for an unconfigured capability.
pub struct UnavailableGenerator;

#[async_trait]
impl TextGenerationService for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        Err(PortError::Unavailable)
    }
}

/// A billing vendor that accepts every subscription.
pub struct AcceptingPayments {
    subscription_id: String,
}

impl AcceptingPayments {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
        }
    }
}

#[async_trait]
impl PaymentService for AcceptingPayments {
    async fn create_subscription(&self, _plan: Plan) -> PortResult<String> {
        Ok(self.subscription_id.clone())
    }
}

/// A billing vendor that declines every subscription.
pub struct RejectingPayments;

#[async_trait]
impl PaymentService for RejectingPayments {
    async fn create_subscription(&self, _plan: Plan) -> PortResult<String> {
        Err(PortError::Collaborator("payment declined".to_string()))
    }
}
