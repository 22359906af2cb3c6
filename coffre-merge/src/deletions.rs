//! Tombstone reconciliation.
//!
//! Both ledgers are unioned (later deletion time wins per uuid), then
//! the target tree is pruned bottom-up. An object falls to its
//! tombstone only if it was not modified at or after the deletion
//! time; a group additionally has to be empty once its own contents
//! were pruned, so nothing alive is ever dragged along. A tombstone is
//! spent once it deleted its object, and a stale one (the object was
//! edited after the deletion) is dropped so the survivor cannot be
//! re-deleted by a later synchronization.

use crate::error::MergeResult;
use crate::merge::{ensure_continue, ProgressSink};
use coffre_model::{Database, DeletedObject, Group};
use coffre_types::{ObjectId, Timestamp};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub(crate) fn apply_deletions(
    target: &mut Database,
    source: &Database,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    let mut deletions: HashMap<ObjectId, Timestamp> = HashMap::new();
    for record in target.deleted_objects.iter().chain(&source.deleted_objects) {
        deletions
            .entry(record.uuid)
            .and_modify(|t| *t = (*t).max(record.deletion_time))
            .or_insert(record.deletion_time);
    }
    if deletions.is_empty() {
        return Ok(());
    }

    let mut spent: HashSet<ObjectId> = HashSet::new();
    prune_group(&mut target.root, &deletions, &mut spent, progress)?;
    if !spent.is_empty() {
        debug!(count = spent.len(), "resolved tombstones");
    }

    // Rebuild the ledger with unioned times: target records first, then
    // source-only ones, minus everything resolved above.
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut ledger: Vec<DeletedObject> = Vec::new();
    for record in target.deleted_objects.iter().chain(&source.deleted_objects) {
        if !seen.insert(record.uuid) || spent.contains(&record.uuid) {
            continue;
        }
        let deletion_time = deletions
            .get(&record.uuid)
            .copied()
            .unwrap_or(record.deletion_time);
        ledger.push(DeletedObject {
            uuid: record.uuid,
            deletion_time,
        });
    }
    target.deleted_objects = ledger;
    Ok(())
}

/// Prunes one group's subtree, children before the children's own
/// removal decision. The group itself is its parent's concern; the
/// tree root is therefore never removed.
fn prune_group(
    group: &mut Group,
    deletions: &HashMap<ObjectId, Timestamp>,
    spent: &mut HashSet<ObjectId>,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    for child in &mut group.groups {
        prune_group(child, deletions, spent, progress)?;
    }

    let mut i = 0;
    while i < group.entries.len() {
        ensure_continue(progress)?;
        let entry = &group.entries[i];
        match deletions.get(&entry.uuid) {
            Some(&t) if entry.times.last_modification < t => {
                spent.insert(entry.uuid);
                group.entries.remove(i);
            }
            Some(_) => {
                // Edited after the deletion: the tombstone is stale
                spent.insert(entry.uuid);
                i += 1;
            }
            None => i += 1,
        }
    }

    let mut i = 0;
    while i < group.groups.len() {
        ensure_continue(progress)?;
        let child = &group.groups[i];
        match deletions.get(&child.uuid) {
            Some(&t) if child.times.last_modification >= t => {
                spent.insert(child.uuid);
                i += 1;
            }
            Some(_) if child.is_empty() => {
                spent.insert(child.uuid);
                group.groups.remove(i);
            }
            // Still holds live objects: keep both group and tombstone
            Some(_) => i += 1,
            None => i += 1,
        }
    }
    Ok(())
}
