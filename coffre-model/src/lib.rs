//! In-memory password database model for Coffre.
//!
//! A database is an ordered forest of [`Group`]s and [`Entry`]s, each
//! identified by an immutable [`ObjectId`](coffre_types::ObjectId), plus:
//!
//! - a tombstone ledger ([`DeletedObject`]) recording soft deletions
//! - a list of [`CustomIcon`]s referenced by groups and entries
//! - scalar metadata ([`Meta`]) with per-field change timestamps
//! - a [`HistoryPolicy`] bounding each entry's snapshot history
//!
//! Sibling order inside a group is semantically meaningful (it is the
//! display order) and is reconciled by the merge engine in
//! `coffre-merge`. Parent links are plain `Option<ObjectId>` back
//! references, never owning pointers, so subtree checks are cheap and
//! cycles are impossible by construction.

mod database;
mod entry;
mod group;
mod store;
mod structure;
mod times;

pub use database::{CustomDataItem, CustomIcon, Database, DeletedObject, HistoryPolicy, Meta};
pub use entry::{is_standard_field, CompareOptions, Entry, Field, STANDARD_FIELDS};
pub use group::{Group, Visit};
pub use store::{StoreError, StoreResult, VaultStore};
pub use structure::StructureItem;
pub use times::Times;
