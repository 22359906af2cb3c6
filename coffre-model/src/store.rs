//! Persistence collaborator surface.
//!
//! The engine never touches disk itself. A store implementation owns
//! the on-disk format (serialization, compression, encryption) and
//! trades complete [`Database`] values with this crate.

use crate::database::Database;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a store implementation can surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying medium could not be read.
    #[error("read error: {0}")]
    Read(String),

    /// The underlying medium could not be written.
    #[error("write error: {0}")]
    Write(String),

    /// The stored form could not be decoded or encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The supplied credentials did not unlock the store.
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Loads and saves whole databases.
pub trait VaultStore {
    /// Loads the database from the backing medium.
    fn load(&mut self) -> StoreResult<Database>;

    /// Persists the database to the backing medium.
    fn save(&mut self, database: &Database) -> StoreResult<()>;
}
