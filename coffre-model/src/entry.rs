//! Password entries and their snapshot history.

use crate::database::HistoryPolicy;
use crate::structure::StructureItem;
use crate::times::Times;
use coffre_types::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The standard field keys every entry is expected to carry.
///
/// For these keys, a missing field and an empty value are equivalent
/// when comparing entries.
pub const STANDARD_FIELDS: [&str; 5] = ["Title", "UserName", "Password", "URL", "Notes"];

/// Returns true if `key` is one of [`STANDARD_FIELDS`].
#[must_use]
pub fn is_standard_field(key: &str) -> bool {
    STANDARD_FIELDS.contains(&key)
}

/// A single key/value field of an entry.
///
/// The `protected` flag marks memory-sensitive values for the UI and
/// persistence layers; it does not participate in merge decisions or
/// equality checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub value: String,
    pub protected: bool,
}

impl Field {
    /// Creates an unprotected field.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            protected: false,
        }
    }

    /// Creates a protected field.
    #[must_use]
    pub fn protected(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            protected: true,
        }
    }
}

/// Which aspects of an entry to skip when comparing two versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub ignore_parent: bool,
    pub ignore_last_access: bool,
    pub ignore_last_modification: bool,
    pub ignore_history: bool,
}

impl CompareOptions {
    /// The comparison the merge engine uses when deciding whether two
    /// versions of an entry differ: location and access metadata are
    /// irrelevant, history is merged separately, content and the
    /// modification time matter.
    #[must_use]
    pub const fn merge() -> Self {
        Self {
            ignore_parent: true,
            ignore_last_access: true,
            ignore_last_modification: false,
            ignore_history: true,
        }
    }
}

/// A password entry.
///
/// An entry is owned by exactly one group at a time (ownership is
/// membership in that group's entry list). `history` holds prior full
/// snapshots of the entry itself; every snapshot shares the owner's
/// uuid and carries no nested history of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: ObjectId,
    /// Uuid of the owning group. Maintained by the group that holds
    /// this entry; `None` only while detached.
    pub parent: Option<ObjectId>,
    pub icon_id: u32,
    pub custom_icon: Option<ObjectId>,
    pub times: Times,
    /// When the entry last moved to its current parent.
    pub location_changed: Timestamp,
    /// The parent before the most recent relocation.
    pub previous_parent: Option<ObjectId>,
    pub fields: BTreeMap<String, Field>,
    pub binaries: BTreeMap<String, Vec<u8>>,
    pub history: Vec<Entry>,
}

impl Entry {
    /// Creates an empty entry with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            uuid: ObjectId::new(),
            parent: None,
            icon_id: 0,
            custom_icon: None,
            times: Times::at(now),
            location_changed: now,
            previous_parent: None,
            fields: BTreeMap::new(),
            binaries: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.value.as_str())
    }

    /// Sets a field, replacing any previous value.
    pub fn set_field(&mut self, key: impl Into<String>, field: Field) {
        self.fields.insert(key.into(), field);
    }

    /// Returns the entry title, or the empty string.
    #[must_use]
    pub fn title(&self) -> &str {
        self.field_value("Title").unwrap_or("")
    }

    /// Compares two versions of this entry.
    ///
    /// Field protection flags are ignored; for standard fields a
    /// missing field and an empty value are equivalent.
    #[must_use]
    pub fn equals(&self, other: &Entry, opts: CompareOptions) -> bool {
        if self.uuid != other.uuid {
            return false;
        }
        if !opts.ignore_parent
            && (self.parent != other.parent || self.location_changed != other.location_changed)
        {
            return false;
        }
        if self.icon_id != other.icon_id || self.custom_icon != other.custom_icon {
            return false;
        }
        if !fields_equal(&self.fields, &other.fields) {
            return false;
        }
        if self.binaries != other.binaries {
            return false;
        }
        if self.times.creation != other.times.creation {
            return false;
        }
        if !opts.ignore_last_modification
            && self.times.last_modification != other.times.last_modification
        {
            return false;
        }
        if !opts.ignore_last_access && self.times.last_access != other.times.last_access {
            return false;
        }
        if self.times.expiry != other.times.expiry || self.times.expires != other.times.expires {
            return false;
        }
        if !opts.ignore_history {
            if self.history.len() != other.history.len() {
                return false;
            }
            for (a, b) in self.history.iter().zip(&other.history) {
                if !a.equals(b, opts) {
                    return false;
                }
            }
        }
        true
    }

    /// Copies scalar properties (fields, binaries, icons, times) from
    /// `other`. Identity, parent and history are untouched.
    ///
    /// With `only_if_newer`, nothing happens unless `other` was
    /// modified more recently than this version.
    pub fn assign_properties(&mut self, other: &Entry, only_if_newer: bool) {
        if only_if_newer && other.times.last_modification <= self.times.last_modification {
            return;
        }
        self.icon_id = other.icon_id;
        self.custom_icon = other.custom_icon;
        self.times = other.times;
        self.fields = other.fields.clone();
        self.binaries = other.binaries.clone();
    }

    /// Pushes the entry's current state onto its own history.
    ///
    /// The snapshot carries no nested history.
    pub fn push_history_snapshot(&mut self) {
        let mut snapshot = self.clone();
        snapshot.history.clear();
        self.history.push(snapshot);
    }

    /// Returns true if some history snapshot already records the given
    /// version verbatim (access metadata aside).
    #[must_use]
    pub fn has_history_matching(&self, version: &Entry) -> bool {
        self.history
            .iter()
            .any(|h| h.equals(version, CompareOptions::merge()))
    }

    /// Approximate in-memory size in bytes, including history.
    #[must_use]
    pub fn approximate_size(&self) -> u64 {
        let mut size = 128u64;
        for (key, field) in &self.fields {
            size += (key.len() + field.value.len()) as u64;
        }
        for (key, data) in &self.binaries {
            size += (key.len() + data.len()) as u64;
        }
        for snapshot in &self.history {
            size += snapshot.approximate_size();
        }
        size
    }

    /// Evicts history snapshots until the policy's item and byte
    /// budgets hold. The oldest snapshot by modification time goes
    /// first.
    pub fn prune_history(&mut self, policy: &HistoryPolicy) {
        if let Some(max_items) = policy.max_items {
            while self.history.len() > max_items as usize {
                self.remove_oldest_snapshot();
            }
        }
        if let Some(max_size) = policy.max_size {
            loop {
                let total: u64 = self.history.iter().map(Entry::approximate_size).sum();
                if total <= max_size || self.history.is_empty() {
                    break;
                }
                self.remove_oldest_snapshot();
            }
        }
    }

    fn remove_oldest_snapshot(&mut self) {
        let oldest = self
            .history
            .iter()
            .enumerate()
            .min_by_key(|(_, h)| h.times.last_modification)
            .map(|(i, _)| i);
        if let Some(i) = oldest {
            self.history.remove(i);
        }
    }

    /// Assigns a fresh identity to this entry. History snapshots follow
    /// the owner's new uuid so the shared-identity invariant holds.
    pub fn regenerate_uuid(&mut self) {
        self.uuid = ObjectId::new();
        self.previous_parent = None;
        for snapshot in &mut self.history {
            snapshot.uuid = self.uuid;
            snapshot.previous_parent = None;
        }
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureItem for Entry {
    fn uuid(&self) -> ObjectId {
        self.uuid
    }

    fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    fn location_changed(&self) -> Timestamp {
        self.location_changed
    }

    fn set_location_changed(&mut self, at: Timestamp) {
        self.location_changed = at;
    }

    fn previous_parent(&self) -> Option<ObjectId> {
        self.previous_parent
    }

    fn set_previous_parent(&mut self, parent: Option<ObjectId>) {
        self.previous_parent = parent;
    }
}

fn fields_equal(a: &BTreeMap<String, Field>, b: &BTreeMap<String, Field>) -> bool {
    let keys: BTreeSet<&str> = a.keys().chain(b.keys()).map(String::as_str).collect();
    for key in keys {
        let va = a.get(key).map(|f| f.value.as_str());
        let vb = b.get(key).map(|f| f.value.as_str());
        match (va, vb) {
            (Some(x), Some(y)) => {
                if x != y {
                    return false;
                }
            }
            (None, None) => {}
            (Some(x), None) | (None, Some(x)) => {
                // Missing standard fields count as empty
                if !(is_standard_field(key) && x.is_empty()) {
                    return false;
                }
            }
        }
    }
    true
}
