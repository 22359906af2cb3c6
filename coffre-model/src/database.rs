//! The database: root group, tombstone ledger, icons, metadata.

use crate::entry::Entry;
use crate::group::Group;
use coffre_types::{Clock, ObjectId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// A soft-delete record: "this uuid was deleted at this time".
///
/// Tombstones prevent objects one side removed from being resurrected
/// by a later synchronization with a copy that still holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub uuid: ObjectId,
    pub deletion_time: Timestamp,
}

/// A custom icon, matched across databases by uuid.
///
/// The image bytes are opaque to this crate; decoding is the UI
/// layer's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomIcon {
    pub uuid: ObjectId,
    pub data: Vec<u8>,
    pub name: Option<String>,
    /// Missing on icons from older stores; treated as older than any
    /// real timestamp during merge.
    pub last_modified: Option<Timestamp>,
}

/// A database-level custom data item with its own change timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDataItem {
    pub value: String,
    pub last_modified: Option<Timestamp>,
}

/// Scalar database properties. Each carries the time it last changed
/// so two copies can be merged field by field, newest wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,
    pub name_changed: Timestamp,
    pub description: String,
    pub description_changed: Timestamp,
    pub default_username: String,
    pub default_username_changed: Timestamp,
    pub color: Option<String>,
    pub color_changed: Timestamp,
    pub recycle_bin: Option<ObjectId>,
    pub recycle_bin_enabled: bool,
    pub recycle_bin_changed: Timestamp,
    pub entry_templates: Option<ObjectId>,
    pub entry_templates_changed: Timestamp,
    pub custom_data: BTreeMap<String, CustomDataItem>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: String::new(),
            name_changed: Timestamp::EPOCH,
            description: String::new(),
            description_changed: Timestamp::EPOCH,
            default_username: String::new(),
            default_username_changed: Timestamp::EPOCH,
            color: None,
            color_changed: Timestamp::EPOCH,
            recycle_bin: None,
            recycle_bin_enabled: true,
            recycle_bin_changed: Timestamp::EPOCH,
            entry_templates: None,
            entry_templates_changed: Timestamp::EPOCH,
            custom_data: BTreeMap::new(),
        }
    }
}

/// Bounds on each entry's snapshot history. `None` lifts the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPolicy {
    pub max_items: Option<u32>,
    /// Cumulative byte budget across all snapshots of one entry.
    pub max_size: Option<u64>,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_items: Some(10),
            max_size: Some(6 * 1024 * 1024),
        }
    }
}

/// A password database: the tree plus its merge bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub root: Group,
    /// Append-only soft-delete ledger, one meaningful record per uuid.
    pub deleted_objects: Vec<DeletedObject>,
    pub custom_icons: Vec<CustomIcon>,
    pub meta: Meta,
    pub history_policy: HistoryPolicy,
}

impl Database {
    /// Creates an empty database with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let meta = Meta {
            name: name.clone(),
            name_changed: Timestamp::now(),
            ..Meta::default()
        };
        Self {
            root: Group::new(name),
            deleted_objects: Vec::new(),
            custom_icons: Vec::new(),
            meta,
            history_policy: HistoryPolicy::default(),
        }
    }

    // ── Tombstones ───────────────────────────────────────────────────

    /// Records a deletion. An existing tombstone for the uuid is kept
    /// and only its time advanced if the new one is later.
    pub fn mark_deleted(&mut self, uuid: ObjectId, at: Timestamp) {
        if let Some(existing) = self.deleted_objects.iter_mut().find(|d| d.uuid == uuid) {
            if at > existing.deletion_time {
                existing.deletion_time = at;
            }
            return;
        }
        self.deleted_objects.push(DeletedObject {
            uuid,
            deletion_time: at,
        });
    }

    /// Returns the tombstone for a uuid, if one exists.
    #[must_use]
    pub fn tombstone_for(&self, uuid: ObjectId) -> Option<&DeletedObject> {
        self.deleted_objects.iter().find(|d| d.uuid == uuid)
    }

    /// Removes an entry from the tree and records its tombstone.
    /// Returns false if no such entry exists.
    pub fn delete_entry(&mut self, uuid: ObjectId, clock: &dyn Clock) -> bool {
        match self.root.remove_entry_recursive(uuid) {
            Some(entry) => {
                self.mark_deleted(entry.uuid, clock.now());
                true
            }
            None => false,
        }
    }

    /// Removes a group subtree from the tree and records tombstones
    /// for every object it contained. The root cannot be deleted.
    pub fn delete_group(&mut self, uuid: ObjectId, clock: &dyn Clock) -> bool {
        if uuid == self.root.uuid {
            return false;
        }
        let Some(group) = self.root.remove_group_recursive(uuid) else {
            return false;
        };
        let now = clock.now();
        for id in group.group_ids() {
            self.mark_deleted(id, now);
        }
        for id in group.entry_ids() {
            self.mark_deleted(id, now);
        }
        true
    }

    // ── Icons ────────────────────────────────────────────────────────

    /// Returns the custom icon with the given uuid, if present.
    #[must_use]
    pub fn custom_icon(&self, uuid: ObjectId) -> Option<&CustomIcon> {
        self.custom_icons.iter().find(|i| i.uuid == uuid)
    }

    /// Resets every group/entry/history icon reference that points at
    /// a custom icon this database no longer holds.
    pub fn clear_dangling_icon_refs(&mut self) {
        let valid: HashSet<ObjectId> = self.custom_icons.iter().map(|i| i.uuid).collect();
        self.root.for_each_group_mut(&mut |group| {
            if group.custom_icon.is_some_and(|u| !valid.contains(&u)) {
                group.custom_icon = None;
            }
        });
        self.root.for_each_entry_mut(&mut |entry| {
            scrub_entry_icon(entry, &valid);
        });
    }

    /// Drops custom icons no group or entry (history included) refers
    /// to. Returns the number removed.
    pub fn remove_unused_icons(&mut self) -> usize {
        let mut referenced: HashSet<ObjectId> = HashSet::new();
        self.root.for_each_group_mut(&mut |group| {
            if let Some(uuid) = group.custom_icon {
                referenced.insert(uuid);
            }
        });
        self.root.for_each_entry_mut(&mut |entry| {
            collect_entry_icons(entry, &mut referenced);
        });
        let before = self.custom_icons.len();
        self.custom_icons.retain(|i| referenced.contains(&i.uuid));
        let removed = before - self.custom_icons.len();
        if removed > 0 {
            debug!(removed, "dropped unused custom icons");
        }
        removed
    }

    // ── Maintenance ──────────────────────────────────────────────────

    /// Applies the history policy to every entry in the database.
    pub fn prune_all_history(&mut self) {
        let policy = self.history_policy;
        self.root.for_each_entry_mut(&mut |entry| {
            entry.prune_history(&policy);
        });
    }

    /// True if two live objects share a uuid. Duplicate identities are
    /// a fixable error state that merge tolerates but callers should
    /// repair.
    #[must_use]
    pub fn has_duplicate_uuids(&self) -> bool {
        let mut seen: HashSet<ObjectId> = HashSet::new();
        for id in self.root.group_ids() {
            if !seen.insert(id) {
                return true;
            }
        }
        for id in self.root.entry_ids() {
            if !seen.insert(id) {
                return true;
            }
        }
        false
    }

    /// The group currently serving as the recycle bin, if configured
    /// and present.
    #[must_use]
    pub fn recycle_bin_group(&self) -> Option<&Group> {
        let uuid = self.meta.recycle_bin?;
        self.root.find_group(uuid)
    }

    /// Assigns fresh identities to every group and entry. Used by the
    /// merge mode that imports a source as all-new objects.
    pub fn regenerate_uuids(&mut self) {
        self.root.regenerate_uuids();
        self.root.parent = None;
    }
}

fn scrub_entry_icon(entry: &mut Entry, valid: &HashSet<ObjectId>) {
    if entry.custom_icon.is_some_and(|u| !valid.contains(&u)) {
        entry.custom_icon = None;
    }
    for snapshot in &mut entry.history {
        scrub_entry_icon(snapshot, valid);
    }
}

fn collect_entry_icons(entry: &mut Entry, referenced: &mut HashSet<ObjectId>) {
    if let Some(uuid) = entry.custom_icon {
        referenced.insert(uuid);
    }
    for snapshot in &mut entry.history {
        collect_entry_icons(snapshot, referenced);
    }
}
