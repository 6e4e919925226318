//! crates/habitchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete storage backend and of the external
//! generation and billing collaborators.

use async_trait::async_trait;

use crate::domain::{Plan, UserRecord};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services
/// (e.g., database, file system, HTTP APIs).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Rejected input; nothing was mutated or persisted.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The capability is disabled because its configuration is absent.
    #[error("This capability is not configured")]
    Unavailable,
    /// An external collaborator was reached but the call failed.
    #[error("External service error: {0}")]
    Collaborator(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for user records, keyed by identifier.
///
/// A missing or corrupt backing store must read as empty (`Ok(None)` for
/// every identifier) rather than failing the process. Every mutation in the
/// system is followed synchronously by a `save`; there is no write
/// buffering.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Loads the record for `identifier`, or `None` if it has never been
    /// seen.
    async fn load(&self, identifier: &str) -> PortResult<Option<UserRecord>>;

    /// Durably writes the record, replacing any previous version. The write
    /// is visible to subsequent `load` calls, including from other sessions.
    async fn save(&self, record: &UserRecord) -> PortResult<()>;
}

/// The external text-generation collaborator: string in, string-or-failure
/// out. No vendor request/response shape leaks through this boundary.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> PortResult<String>;
}

/// The external billing collaborator.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a recurring subscription for `plan` with the billing vendor
    /// and returns the vendor's subscription identifier.
    async fn create_subscription(&self, plan: Plan) -> PortResult<String>;
}
