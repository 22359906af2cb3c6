//! Shared helpers for merge tests.

#![allow(dead_code)]

use coffre_merge::ProgressSink;
use coffre_model::{Database, Entry, Field, Group, Times};
use coffre_types::Timestamp;

pub fn ts(millis: u64) -> Timestamp {
    Timestamp::from_millis(millis)
}

/// An entry with the given title whose timestamps are all `at`.
pub fn entry_at(title: &str, at: Timestamp) -> Entry {
    let mut entry = Entry::new();
    entry.set_field("Title", Field::plain(title));
    entry.times = Times::at(at);
    entry.location_changed = at;
    entry
}

/// A group whose timestamps are all `at`.
pub fn group_at(name: &str, at: Timestamp) -> Group {
    let mut group = Group::new(name);
    group.times = Times::at(at);
    group.location_changed = at;
    group
}

/// An empty database with deterministic root timestamps. Two copies of
/// the same logical database come from cloning the result.
pub fn base_db(name: &str) -> Database {
    let mut db = Database::new(name);
    db.root.times = Times::at(ts(10));
    db.root.location_changed = ts(10);
    db.meta.name_changed = ts(10);
    db
}

/// Titles of a group's entries in list order.
pub fn titles(group: &Group) -> Vec<String> {
    group.entries.iter().map(|e| e.title().to_string()).collect()
}

/// Names of a group's subgroups in list order.
pub fn group_names(group: &Group) -> Vec<String> {
    group.groups.iter().map(|g| g.name.clone()).collect()
}

/// A progress sink that cancels immediately.
pub struct CancelNow;

impl ProgressSink for CancelNow {
    fn continue_work(&self) -> bool {
        false
    }
}
