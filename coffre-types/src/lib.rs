//! Core type definitions for Coffre.
//!
//! This crate defines the fundamental types used throughout the password
//! database engine:
//! - Object identifiers (random UUID v4)
//! - UTC wall-clock timestamps with millisecond precision
//! - The clock capability used when stamping tombstones and touches
//!
//! Domain types (groups, entries, the database itself) live in
//! `coffre-model`; the synchronization engine lives in `coffre-merge`.

mod clock;
mod ids;
mod timestamp;

pub use clock::{Clock, SystemClock};
pub use ids::ObjectId;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
