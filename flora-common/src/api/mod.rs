//! Shared HTTP API types
//!
//! Contains ONLY serde types, no HTTP framework dependencies. Services wrap
//! these with their own handlers.

pub mod types;

pub use types::{HealthResponse, IdentificationResult, IdentifyRequest};
