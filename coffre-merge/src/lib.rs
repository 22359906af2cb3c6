//! Database synchronization/merge engine for Coffre.
//!
//! Given two independently modified copies of the same logical
//! database, [`merge_in`] produces a single merged tree in place:
//!
//! - objects keep their identity across the merge
//! - field-level conflicts resolve by modification time
//! - structural conflicts (moves, reorders) resolve by the newer
//!   `location_changed` stamp
//! - tombstoned objects stay deleted and tombstones are consumed once
//!   applied
//! - losing entry versions are preserved as history snapshots
//!
//! The engine is single threaded and synchronous. The source database
//! is never mutated; the target is exclusively owned for the duration
//! of the call. Cooperative cancellation through [`ProgressSink`]
//! aborts mid-merge and leaves the target partially updated, so
//! callers needing atomicity must keep a copy.

mod deletions;
mod error;
mod merge;
mod pool;
mod relocate;
mod reorder;

pub use error::{MergeError, MergeResult};
pub use merge::{merge_in, MergeMode, ProgressSink};
pub use pool::{ItemKind, ObjectPool, PoolNode, PoolSlot};
