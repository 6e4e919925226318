//! services/api/src/lib.rs
//!
//! Library crate for the `api` service: configuration, the service error
//! type, the concrete port adapters, and the web layer. The `api` binary
//! wires these together; the handler tests build the same router against
//! mock adapters.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
