//! Error types for the merge engine.

use thiserror::Error;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that can abort a merge.
///
/// Structural anomalies in the inputs (missing parents, relocation
/// cycles, unknown tombstone uuids) are handled defensively and never
/// surface here; cancellation is the only abort condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The caller's progress sink requested a stop. The target is left
    /// partially merged.
    #[error("merge cancelled by caller")]
    Cancelled,
}
