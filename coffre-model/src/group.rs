//! Groups: the interior nodes of the database forest.

use crate::entry::Entry;
use crate::structure::StructureItem;
use crate::times::Times;
use coffre_types::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Early-stop signal for tree traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// A group of entries and subgroups.
///
/// The order of `groups` and `entries` is the display order and is
/// itself merged. The parent back reference is a plain uuid so the
/// tree has single ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uuid: ObjectId,
    /// Uuid of the owning group, `None` for the root.
    pub parent: Option<ObjectId>,
    pub name: String,
    pub notes: String,
    pub icon_id: u32,
    pub custom_icon: Option<ObjectId>,
    pub times: Times,
    /// When the group last moved to its current parent.
    pub location_changed: Timestamp,
    /// The parent before the most recent relocation.
    pub previous_parent: Option<ObjectId>,
    pub groups: Vec<Group>,
    pub entries: Vec<Entry>,
}

impl Group {
    /// Creates an empty group with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            uuid: ObjectId::new(),
            parent: None,
            name: name.into(),
            notes: String::new(),
            icon_id: 0,
            custom_icon: None,
            times: Times::at(now),
            location_changed: now,
            previous_parent: None,
            groups: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// A copy of this group's scalar state with empty child lists and
    /// no parent. Used when the merge walk materializes a source-only
    /// group whose children arrive through their own walk steps.
    #[must_use]
    pub fn clone_shell(&self) -> Self {
        let mut shell = self.clone();
        shell.parent = None;
        shell.groups = Vec::new();
        shell.entries = Vec::new();
        shell
    }

    /// Copies scalar properties (name, notes, icons, times) from
    /// `other`. Identity, parent and children are untouched.
    ///
    /// With `only_if_newer`, nothing happens unless `other` was
    /// modified more recently than this version.
    pub fn assign_properties(&mut self, other: &Group, only_if_newer: bool) {
        if only_if_newer && other.times.last_modification <= self.times.last_modification {
            return;
        }
        self.name = other.name.clone();
        self.notes = other.notes.clone();
        self.icon_id = other.icon_id;
        self.custom_icon = other.custom_icon;
        self.times = other.times;
    }

    // ── Child management ─────────────────────────────────────────────

    /// Appends a subgroup, taking ownership and fixing its parent link.
    pub fn add_group(&mut self, group: Group) {
        let at = self.groups.len();
        self.insert_group(at, group);
    }

    /// Inserts a subgroup at `index` (clamped to the list length).
    pub fn insert_group(&mut self, index: usize, mut group: Group) {
        group.parent = Some(self.uuid);
        let index = index.min(self.groups.len());
        self.groups.insert(index, group);
    }

    /// Appends an entry, taking ownership and fixing its parent link.
    pub fn add_entry(&mut self, entry: Entry) {
        let at = self.entries.len();
        self.insert_entry(at, entry);
    }

    /// Inserts an entry at `index` (clamped to the list length).
    pub fn insert_entry(&mut self, index: usize, mut entry: Entry) {
        entry.parent = Some(self.uuid);
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Detaches a direct child group by uuid.
    pub fn take_group(&mut self, uuid: ObjectId) -> Option<Group> {
        let index = self.groups.iter().position(|g| g.uuid == uuid)?;
        let mut group = self.groups.remove(index);
        group.parent = None;
        Some(group)
    }

    /// Detaches a direct child entry by uuid.
    pub fn take_entry(&mut self, uuid: ObjectId) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.uuid == uuid)?;
        let mut entry = self.entries.remove(index);
        entry.parent = None;
        Some(entry)
    }

    /// Detaches the group with the given uuid from anywhere in this
    /// subtree. The subtree root itself is never removed.
    pub fn remove_group_recursive(&mut self, uuid: ObjectId) -> Option<Group> {
        if let Some(group) = self.take_group(uuid) {
            return Some(group);
        }
        for child in &mut self.groups {
            if let Some(group) = child.remove_group_recursive(uuid) {
                return Some(group);
            }
        }
        None
    }

    /// Detaches the entry with the given uuid from anywhere in this
    /// subtree.
    pub fn remove_entry_recursive(&mut self, uuid: ObjectId) -> Option<Entry> {
        if let Some(entry) = self.take_entry(uuid) {
            return Some(entry);
        }
        for child in &mut self.groups {
            if let Some(entry) = child.remove_entry_recursive(uuid) {
                return Some(entry);
            }
        }
        None
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Finds a group (this one included) by uuid in the subtree.
    #[must_use]
    pub fn find_group(&self, uuid: ObjectId) -> Option<&Group> {
        if self.uuid == uuid {
            return Some(self);
        }
        self.groups.iter().find_map(|g| g.find_group(uuid))
    }

    /// Finds a group by uuid in the subtree, mutably.
    pub fn find_group_mut(&mut self, uuid: ObjectId) -> Option<&mut Group> {
        let path = self.path_to(uuid)?;
        Some(self.descend_mut(&path))
    }

    /// Finds an entry by uuid in the subtree.
    #[must_use]
    pub fn find_entry(&self, uuid: ObjectId) -> Option<&Entry> {
        if let Some(entry) = self.entries.iter().find(|e| e.uuid == uuid) {
            return Some(entry);
        }
        self.groups.iter().find_map(|g| g.find_entry(uuid))
    }

    /// Finds an entry by uuid in the subtree, mutably.
    pub fn find_entry_mut(&mut self, uuid: ObjectId) -> Option<&mut Entry> {
        let (path, index) = self.locate_entry(uuid)?;
        self.descend_mut(&path).entries.get_mut(index)
    }

    /// The child-index path from this group to the group with the
    /// given uuid. Empty path means this group itself.
    #[must_use]
    pub fn path_to(&self, uuid: ObjectId) -> Option<Vec<usize>> {
        if self.uuid == uuid {
            return Some(Vec::new());
        }
        for (i, child) in self.groups.iter().enumerate() {
            if let Some(mut path) = child.path_to(uuid) {
                path.insert(0, i);
                return Some(path);
            }
        }
        None
    }

    /// Walks a child-index path, stopping at the deepest valid node if
    /// the path is stale.
    pub fn descend_mut(&mut self, path: &[usize]) -> &mut Group {
        let mut current = self;
        for &index in path {
            if index >= current.groups.len() {
                break;
            }
            current = &mut current.groups[index];
        }
        current
    }

    fn locate_entry(&self, uuid: ObjectId) -> Option<(Vec<usize>, usize)> {
        if let Some(index) = self.entries.iter().position(|e| e.uuid == uuid) {
            return Some((Vec::new(), index));
        }
        for (i, child) in self.groups.iter().enumerate() {
            if let Some((mut path, index)) = child.locate_entry(uuid) {
                path.insert(0, i);
                return Some((path, index));
            }
        }
        None
    }

    // ── Traversal ────────────────────────────────────────────────────

    /// Pre-order traversal: this group, its entries, then each subgroup
    /// recursively. Returns false if a visitor stopped the walk.
    pub fn traverse(
        &self,
        on_group: &mut impl FnMut(&Group) -> Visit,
        on_entry: &mut impl FnMut(&Entry) -> Visit,
    ) -> bool {
        if on_group(self) == Visit::Stop {
            return false;
        }
        for entry in &self.entries {
            if on_entry(entry) == Visit::Stop {
                return false;
            }
        }
        for group in &self.groups {
            if !group.traverse(on_group, on_entry) {
                return false;
            }
        }
        true
    }

    /// Applies `f` to every group in the subtree, this one included,
    /// in pre-order.
    pub fn for_each_group_mut(&mut self, f: &mut impl FnMut(&mut Group)) {
        f(self);
        for group in &mut self.groups {
            group.for_each_group_mut(f);
        }
    }

    /// Applies `f` to every entry in the subtree.
    pub fn for_each_entry_mut(&mut self, f: &mut impl FnMut(&mut Entry)) {
        for entry in &mut self.entries {
            f(entry);
        }
        for group in &mut self.groups {
            group.for_each_entry_mut(f);
        }
    }

    /// Uuids of every group in the subtree, this one included, in
    /// pre-order.
    #[must_use]
    pub fn group_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        self.traverse(
            &mut |g| {
                ids.push(g.uuid);
                Visit::Continue
            },
            &mut |_| Visit::Continue,
        );
        ids
    }

    /// Uuids of every entry in the subtree, in pre-order.
    #[must_use]
    pub fn entry_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        self.traverse(
            &mut |_| Visit::Continue,
            &mut |e| {
                ids.push(e.uuid);
                Visit::Continue
            },
        );
        ids
    }

    /// True if the subtree rooted here contains the given group uuid
    /// (this group included). Used as the relocation cycle check.
    #[must_use]
    pub fn contains_group(&self, uuid: ObjectId) -> bool {
        self.find_group(uuid).is_some()
    }

    /// True if the group has no subgroups and no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.entries.is_empty()
    }

    // ── Identity maintenance ─────────────────────────────────────────

    /// Assigns fresh identities to this group and everything beneath
    /// it, then re-links parent references.
    pub fn regenerate_uuids(&mut self) {
        self.uuid = ObjectId::new();
        self.previous_parent = None;
        for entry in &mut self.entries {
            entry.regenerate_uuid();
        }
        for group in &mut self.groups {
            group.regenerate_uuids();
        }
        self.relink_parents();
    }

    /// Rewrites the parent back references of direct children to this
    /// group's uuid, recursively.
    pub fn relink_parents(&mut self) {
        let uuid = self.uuid;
        for entry in &mut self.entries {
            entry.parent = Some(uuid);
        }
        for group in &mut self.groups {
            group.parent = Some(uuid);
            group.relink_parents();
        }
    }
}

impl StructureItem for Group {
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
