//! Relocation pass: reconciling objects whose parent diverged.
//!
//! For every object both trees know, the side with the newer
//! `location_changed` stamp decides the parent. Runs on the
//! pre-mutation pools; only the live target tree is modified.

use crate::error::MergeResult;
use crate::merge::{best_insert_index, ensure_continue, ProgressSink};
use crate::pool::{ItemKind, ObjectPool};
use coffre_model::{Database, StructureItem};
use coffre_types::{ObjectId, Timestamp};
use tracing::{debug, warn};

pub(crate) fn relocate_groups(
    target: &mut Database,
    source_root: ObjectId,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    let target_root = target.root.uuid;
    for uuid in target.root.group_ids() {
        if uuid == target_root {
            continue;
        }
        ensure_continue(progress)?;

        let Some(org) = pool_target.get_by_uuid(uuid) else {
            continue;
        };
        let Some(src) = pool_source.get_by_uuid(uuid) else {
            continue;
        };
        // The two roots are the same logical container
        let src_parent = match src.parent {
            Some(p) if p == source_root => Some(target_root),
            other => other,
        };

        if org.parent == src_parent {
            // No divergence; refresh to the newer move stamp
            refresh_group_location(target, uuid, org.location_changed.max(src.location_changed));
            continue;
        }
        if src.location_changed <= org.location_changed {
            continue;
        }
        let Some(dest) = src_parent else {
            continue;
        };
        if target.root.find_group(dest).is_none() {
            warn!(%uuid, %dest, "relocation destination not found, skipping");
            continue;
        }
        // A group may never move into its own subtree
        if target
            .root
            .find_group(uuid)
            .is_some_and(|g| g.contains_group(dest))
        {
            warn!(%uuid, %dest, "relocation would create a cycle, skipping");
            continue;
        }
        move_group(target, uuid, dest, pool_source, src.location_changed);
    }
    Ok(())
}

fn refresh_group_location(target: &mut Database, uuid: ObjectId, at: Timestamp) {
    if let Some(group) = target.root.find_group_mut(uuid) {
        group.set_location_changed(at);
    }
}

fn move_group(
    target: &mut Database,
    uuid: ObjectId,
    dest: ObjectId,
    pool_source: &ObjectPool<'_>,
    location_changed: Timestamp,
) {
    let Some(old_parent) = target.root.find_group(uuid).and_then(|g| g.parent) else {
        warn!(%uuid, "group to relocate has no live parent, skipping");
        return;
    };
    let Some(mut group) = target
        .root
        .find_group_mut(old_parent)
        .and_then(|p| p.take_group(uuid))
    else {
        warn!(%uuid, "group to relocate not found under its parent, skipping");
        return;
    };
    group.set_previous_parent(Some(old_parent));
    group.set_location_changed(location_changed);

    match target.root.find_group_mut(dest) {
        Some(container) => {
            let index = best_insert_index(&container.groups, uuid, pool_source, ItemKind::Group);
            debug!(%uuid, %dest, "relocating group");
            container.insert_group(index, group);
        }
        None => {
            // Checked above; reattach rather than lose the subtree
            warn!(%uuid, %dest, "relocation destination vanished, reattaching at root");
            target.root.add_group(group);
        }
    }
}

pub(crate) fn relocate_entries(
    target: &mut Database,
    source_root: ObjectId,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    let target_root = target.root.uuid;
    for uuid in target.root.entry_ids() {
        ensure_continue(progress)?;

        let Some(org) = pool_target.get_by_uuid(uuid) else {
            continue;
        };
        let Some(src) = pool_source.get_by_uuid(uuid) else {
            continue;
        };
        let src_parent = match src.parent {
            Some(p) if p == source_root => Some(target_root),
            other => other,
        };

        if org.parent == src_parent {
            let newest = org.location_changed.max(src.location_changed);
            if let Some(entry) = target.root.find_entry_mut(uuid) {
                entry.set_location_changed(newest);
            }
            continue;
        }
        if src.location_changed <= org.location_changed {
            continue;
        }
        let Some(dest) = src_parent else {
            continue;
        };
        if target.root.find_group(dest).is_none() {
            warn!(%uuid, %dest, "relocation destination not found, skipping");
            continue;
        }
        move_entry(target, uuid, dest, pool_source, src.location_changed);
    }
    Ok(())
}

fn move_entry(
    target: &mut Database,
    uuid: ObjectId,
    dest: ObjectId,
    pool_source: &ObjectPool<'_>,
    location_changed: Timestamp,
) {
    let Some(old_parent) = target.root.find_entry(uuid).and_then(|e| e.parent) else {
        warn!(%uuid, "entry to relocate has no live parent, skipping");
        return;
    };
    let Some(mut entry) = target
        .root
        .find_group_mut(old_parent)
        .and_then(|p| p.take_entry(uuid))
    else {
        warn!(%uuid, "entry to relocate not found under its parent, skipping");
        return;
    };
    entry.set_previous_parent(Some(old_parent));
    entry.set_location_changed(location_changed);

    match target.root.find_group_mut(dest) {
        Some(container) => {
            let index = best_insert_index(&container.entries, uuid, pool_source, ItemKind::Entry);
            debug!(%uuid, %dest, "relocating entry");
            container.insert_entry(index, entry);
        }
        None => {
            warn!(%uuid, %dest, "relocation destination vanished, reattaching at root");
            target.root.add_entry(entry);
        }
    }
}
