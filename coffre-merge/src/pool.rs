//! Pre-order sequence index over one tree snapshot.
//!
//! A pool assigns every group and entry of a tree a stable sequence
//! number reflecting its pre-order position, and answers uuid and id
//! lookups in O(1). Two pools (one per tree) let the merge passes
//! compare relative ordering across independently edited copies.
//!
//! A pool is a snapshot: it must be discarded once the underlying tree
//! changes shape, since its sequence numbers go stale.

use coffre_model::{Entry, Group};
use coffre_types::{ObjectId, Timestamp};
use std::collections::HashMap;
use tracing::warn;

/// Whether a pool slot indexes a group or an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Group,
    Entry,
}

/// A reference to the indexed node.
#[derive(Debug, Clone, Copy)]
pub enum PoolNode<'a> {
    Group(&'a Group),
    Entry(&'a Entry),
}

impl<'a> PoolNode<'a> {
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            PoolNode::Group(_) => ItemKind::Group,
            PoolNode::Entry(_) => ItemKind::Entry,
        }
    }

    #[must_use]
    pub fn uuid(&self) -> ObjectId {
        match self {
            PoolNode::Group(g) => g.uuid,
            PoolNode::Entry(e) => e.uuid,
        }
    }
}

/// One indexed object: its position, node and location bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct PoolSlot<'a> {
    /// Pre-order sequence number, starting at 1. Zero is never used so
    /// it can stand for "not found" in packed representations.
    pub sequence: u64,
    pub node: PoolNode<'a>,
    /// Parent group uuid as of the snapshot, `None` for the root.
    pub parent: Option<ObjectId>,
    pub location_changed: Timestamp,
    pub previous_parent: Option<ObjectId>,
}

/// A sequence-numbered index over one tree snapshot.
pub struct ObjectPool<'a> {
    slots: Vec<PoolSlot<'a>>,
    by_uuid: HashMap<ObjectId, u64>,
}

impl<'a> ObjectPool<'a> {
    /// Indexes the tree rooted at `root` in pre-order: a group first,
    /// then its entries, then its subgroups recursively. The root
    /// receives sequence number 1.
    #[must_use]
    pub fn build(root: &'a Group) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            by_uuid: HashMap::new(),
        };
        pool.index_group(root);
        pool
    }

    fn index_group(&mut self, group: &'a Group) {
        self.push(
            PoolNode::Group(group),
            group.parent,
            group.location_changed,
            group.previous_parent,
        );
        for entry in &group.entries {
            self.push(
                PoolNode::Entry(entry),
                entry.parent,
                entry.location_changed,
                entry.previous_parent,
            );
        }
        for child in &group.groups {
            self.index_group(child);
        }
    }

    fn push(
        &mut self,
        node: PoolNode<'a>,
        parent: Option<ObjectId>,
        location_changed: Timestamp,
        previous_parent: Option<ObjectId>,
    ) {
        let uuid = node.uuid();
        let sequence = self.slots.len() as u64 + 1;
        if self.by_uuid.contains_key(&uuid) {
            // Duplicate identities are an input anomaly; first wins
            warn!(%uuid, "duplicate uuid while indexing tree, keeping first occurrence");
            return;
        }
        self.by_uuid.insert(uuid, sequence);
        self.slots.push(PoolSlot {
            sequence,
            node,
            parent,
            location_changed,
            previous_parent,
        });
    }

    /// Number of indexed objects; also the highest sequence number.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.slots.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Looks up a slot by uuid.
    #[must_use]
    pub fn get_by_uuid(&self, uuid: ObjectId) -> Option<&PoolSlot<'a>> {
        let sequence = *self.by_uuid.get(&uuid)?;
        self.get_by_id(sequence)
    }

    /// Looks up a slot by sequence number. Zero yields `None`.
    #[must_use]
    pub fn get_by_id(&self, sequence: u64) -> Option<&PoolSlot<'a>> {
        if sequence == 0 {
            return None;
        }
        self.slots.get(sequence as usize - 1)
    }

    /// The sequence number of a uuid, if indexed.
    #[must_use]
    pub fn sequence_of(&self, uuid: ObjectId) -> Option<u64> {
        self.by_uuid.get(&uuid).copied()
    }

    /// Ordered uuids of the sibling list (groups or entries) of the
    /// parent that holds `uuid` in this snapshot.
    #[must_use]
    pub fn sibling_order(&self, uuid: ObjectId, kind: ItemKind) -> Option<Vec<ObjectId>> {
        let slot = self.get_by_uuid(uuid)?;
        let parent = self.get_by_uuid(slot.parent?)?;
        let PoolNode::Group(group) = parent.node else {
            return None;
        };
        Some(match kind {
            ItemKind::Group => group.groups.iter().map(|g| g.uuid).collect(),
            ItemKind::Entry => group.entries.iter().map(|e| e.uuid).collect(),
        })
    }
}
