//! The merge orchestrator.

use crate::deletions::apply_deletions;
use crate::error::{MergeError, MergeResult};
use crate::pool::{ItemKind, ObjectPool};
use crate::relocate::{relocate_entries, relocate_groups};
use crate::reorder::reorder_tree;
use coffre_model::{CompareOptions, Database, Entry, Group, StructureItem};
use coffre_types::ObjectId;
use std::collections::btree_map;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How conflicts between the two databases are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Insert source-only objects; never touch existing ones.
    None,
    /// Source always wins on objects present in both.
    OverwriteExisting,
    /// Target always wins on objects present in both.
    KeepExisting,
    /// The side with the newer modification time wins, per object.
    OverwriteIfNewer,
    /// Re-identify everything in the source first, so the whole source
    /// tree is imported as new objects.
    CreateNewUuids,
    /// Full bidirectional reconciliation: newest-wins properties plus
    /// relocation, sibling reordering and tombstone application.
    Synchronize,
}

/// Cooperative cancellation, polled between tree-walk steps.
pub trait ProgressSink {
    /// Returns false to abort the merge.
    fn continue_work(&self) -> bool;
}

pub(crate) fn ensure_continue(progress: Option<&dyn ProgressSink>) -> MergeResult<()> {
    match progress {
        Some(sink) if !sink.continue_work() => Err(MergeError::Cancelled),
        _ => Ok(()),
    }
}

/// Merges `source` into `target` in place.
///
/// `source` is read only; `target` is mutated. On cancellation the
/// target is left partially merged, so callers that need atomicity
/// must snapshot it first.
pub fn merge_in(
    target: &mut Database,
    source: &Database,
    mode: MergeMode,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    // Re-identify a private copy of the source when importing as new
    let reidentified;
    let source = if mode == MergeMode::CreateNewUuids {
        let mut copy = source.clone();
        copy.regenerate_uuids();
        reidentified = copy;
        &reidentified
    } else {
        source
    };

    // Structure snapshots taken before any mutation; the pools index
    // these and stay valid while the live target changes shape.
    let target_snapshot = target.root.clone();
    let pool_target = ObjectPool::build(&target_snapshot);
    let pool_source = ObjectPool::build(&source.root);

    merge_walk(target, source, mode, &pool_source, progress)?;

    if mode == MergeMode::Synchronize {
        relocate_groups(target, source.root.uuid, &pool_target, &pool_source, progress)?;
        relocate_entries(target, source.root.uuid, &pool_target, &pool_source, progress)?;
        reorder_tree(target, &pool_target, &pool_source, progress)?;
        apply_deletions(target, source, progress)?;
    }

    // Group uuids must be final before resolving the recycle bin and
    // template references
    merge_meta(target, source, mode);
    merge_custom_icons(target, source, mode);
    target.clear_dangling_icon_refs();
    target.prune_all_history();

    Ok(())
}

// ── Merge walk ───────────────────────────────────────────────────────

enum SourceItem<'a> {
    Group(&'a Group),
    Entry(&'a Entry),
}

fn collect_pre_order<'a>(group: &'a Group, out: &mut Vec<SourceItem<'a>>) {
    out.push(SourceItem::Group(group));
    for entry in &group.entries {
        out.push(SourceItem::Entry(entry));
    }
    for child in &group.groups {
        collect_pre_order(child, out);
    }
}

fn merge_walk(
    target: &mut Database,
    source: &Database,
    mode: MergeMode,
    pool_source: &ObjectPool<'_>,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    let mut items = Vec::new();
    collect_pre_order(&source.root, &mut items);
    let source_root = source.root.uuid;

    for item in items {
        ensure_continue(progress)?;
        match item {
            // The source root is matched positionally with the target
            // root and never inserted
            SourceItem::Group(group) if group.uuid == source_root => {}
            SourceItem::Group(group) => {
                merge_group(target, group, source_root, mode, pool_source);
            }
            SourceItem::Entry(entry) => {
                merge_entry(target, entry, source_root, mode, pool_source);
            }
        }
    }
    Ok(())
}

fn merge_group(
    target: &mut Database,
    source_group: &Group,
    source_root: ObjectId,
    mode: MergeMode,
    pool_source: &ObjectPool<'_>,
) {
    if let Some(local) = target.root.find_group_mut(source_group.uuid) {
        match mode {
            MergeMode::OverwriteExisting => local.assign_properties(source_group, false),
            MergeMode::OverwriteIfNewer | MergeMode::Synchronize => {
                local.assign_properties(source_group, true);
            }
            MergeMode::None | MergeMode::KeepExisting | MergeMode::CreateNewUuids => {}
        }
        return;
    }

    let path = container_path(&target.root, source_group.parent, source_root);
    let container = target.root.descend_mut(&path);
    let index = best_insert_index(&container.groups, source_group.uuid, pool_source, ItemKind::Group);
    debug!(uuid = %source_group.uuid, name = %source_group.name, "inserting source-only group");
    container.insert_group(index, source_group.clone_shell());
}

fn merge_entry(
    target: &mut Database,
    source_entry: &Entry,
    source_root: ObjectId,
    mode: MergeMode,
    pool_source: &ObjectPool<'_>,
) {
    if let Some(local) = target.root.find_entry_mut(source_entry.uuid) {
        let equal = local.equals(source_entry, CompareOptions::merge());
        let local_modified = local.times.last_modification;
        let source_modified = source_entry.times.last_modification;

        // Back up the local version before it is overwritten, unless
        // the source already carries it as a snapshot
        let mut backup_local = !equal;
        if mode != MergeMode::OverwriteExisting {
            backup_local &= source_modified > local_modified;
        }
        backup_local &= !source_entry.has_history_matching(local);

        // Mirror image: preserve the source version that is about to
        // be discarded, unless the local side already has it
        let mut backup_source = !equal && mode != MergeMode::OverwriteExisting;
        backup_source &= local_modified > source_modified;
        backup_source &= !local.has_history_matching(source_entry);

        if backup_local {
            local.push_history_snapshot();
        }

        let source_with_backup;
        let source_for_history = if backup_source {
            let mut copy = source_entry.clone();
            copy.push_history_snapshot();
            source_with_backup = copy;
            &source_with_backup
        } else {
            source_entry
        };

        match mode {
            MergeMode::OverwriteExisting => local.assign_properties(source_entry, false),
            MergeMode::OverwriteIfNewer | MergeMode::Synchronize => {
                local.assign_properties(source_entry, true);
            }
            MergeMode::None | MergeMode::KeepExisting | MergeMode::CreateNewUuids => {}
        }

        merge_entry_history(local, source_for_history, mode);
        return;
    }

    let path = container_path(&target.root, source_entry.parent, source_root);
    let container = target.root.descend_mut(&path);
    let index = best_insert_index(&container.entries, source_entry.uuid, pool_source, ItemKind::Entry);
    debug!(uuid = %source_entry.uuid, "inserting source-only entry");
    let mut entry = source_entry.clone();
    entry.parent = None;
    container.insert_entry(index, entry);
}

/// Maps a source parent uuid to the child-index path of its local
/// counterpart. The source root maps to the target root; an unknown
/// parent falls back to the root.
fn container_path(root: &Group, source_parent: Option<ObjectId>, source_root: ObjectId) -> Vec<usize> {
    let Some(parent) = source_parent else {
        return Vec::new();
    };
    if parent == source_root {
        return Vec::new();
    }
    match root.path_to(parent) {
        Some(path) => path,
        None => {
            warn!(%parent, "local counterpart of source parent not found, inserting at root");
            Vec::new()
        }
    }
}

/// The best-position rule for inserting a new object into a sibling
/// list: place it next to the nearest sibling (by source pre-order
/// sequence) that also exists locally — before the nearest later one,
/// after the nearest earlier one, or at the end.
pub(crate) fn best_insert_index<T: StructureItem>(
    siblings: &[T],
    new_uuid: ObjectId,
    pool_source: &ObjectPool<'_>,
    kind: ItemKind,
) -> usize {
    let Some(slot) = pool_source.get_by_uuid(new_uuid) else {
        return siblings.len();
    };
    let sequence = slot.sequence;
    let parent = slot.parent;
    let local_index = |uuid: ObjectId| siblings.iter().position(|s| s.uuid() == uuid);

    for id in (sequence + 1)..=pool_source.len() {
        let Some(candidate) = pool_source.get_by_id(id) else {
            continue;
        };
        if candidate.parent != parent || candidate.node.kind() != kind {
            continue;
        }
        if let Some(index) = local_index(candidate.node.uuid()) {
            return index;
        }
    }
    for id in (1..sequence).rev() {
        let Some(candidate) = pool_source.get_by_id(id) else {
            continue;
        };
        if candidate.parent != parent || candidate.node.kind() != kind {
            continue;
        }
        if let Some(index) = local_index(candidate.node.uuid()) {
            return index + 1;
        }
    }
    siblings.len()
}

// ── Entry history ────────────────────────────────────────────────────

/// Merges the source entry's history into the local entry's: union by
/// modification time, local wins on collision unless the mode forces
/// the source, result ordered ascending.
fn merge_entry_history(local: &mut Entry, source: &Entry, mode: MergeMode) {
    if local.uuid != source.uuid {
        warn!(local = %local.uuid, source = %source.uuid, "history merge across identities, skipping");
        return;
    }

    // Fast path: both histories already carry the same timeline
    if local.history.len() == source.history.len() {
        let identical = local
            .history
            .iter()
            .zip(&source.history)
            .all(|(a, b)| a.times.last_modification == b.times.last_modification);
        if identical {
            return;
        }
    }

    let mut by_time: BTreeMap<_, Entry> = local
        .history
        .drain(..)
        .map(|snapshot| (snapshot.times.last_modification, snapshot))
        .collect();

    for snapshot in &source.history {
        match by_time.entry(snapshot.times.last_modification) {
            btree_map::Entry::Occupied(mut occupied) => {
                if mode == MergeMode::OverwriteExisting {
                    occupied.insert(snapshot.clone());
                }
            }
            btree_map::Entry::Vacant(vacant) => {
                vacant.insert(snapshot.clone());
            }
        }
    }

    let owner = local.uuid;
    local.history = by_time
        .into_values()
        .map(|mut snapshot| {
            // Snapshots share the owner's identity and carry no nested
            // history
            snapshot.uuid = owner;
            snapshot.history.clear();
            snapshot
        })
        .collect();
}

// ── Database properties ──────────────────────────────────────────────

fn merge_meta(target: &mut Database, source: &Database, mode: MergeMode) {
    if matches!(mode, MergeMode::KeepExisting | MergeMode::None) {
        return;
    }
    let force = mode == MergeMode::OverwriteExisting;
    let root = &target.root;
    let meta = &mut target.meta;
    let other = &source.meta;

    if force || other.name_changed > meta.name_changed {
        meta.name = other.name.clone();
        meta.name_changed = other.name_changed;
    }
    if force || other.description_changed > meta.description_changed {
        meta.description = other.description.clone();
        meta.description_changed = other.description_changed;
    }
    if force || other.default_username_changed > meta.default_username_changed {
        meta.default_username = other.default_username.clone();
        meta.default_username_changed = other.default_username_changed;
    }
    if force || other.color_changed > meta.color_changed {
        meta.color = other.color.clone();
        meta.color_changed = other.color_changed;
    }

    // Reference properties fall back from the winning candidate to the
    // losing one, then to nothing, if the referenced group is gone
    let (mut preferred, mut alternate) = (meta.recycle_bin, other.recycle_bin);
    if force || other.recycle_bin_changed > meta.recycle_bin_changed {
        (preferred, alternate) = (other.recycle_bin, meta.recycle_bin);
        meta.recycle_bin_enabled = other.recycle_bin_enabled;
        meta.recycle_bin_changed = other.recycle_bin_changed;
    }
    meta.recycle_bin = resolve_group_ref(root, preferred, alternate);

    let (mut preferred, mut alternate) = (meta.entry_templates, other.entry_templates);
    if force || other.entry_templates_changed > meta.entry_templates_changed {
        (preferred, alternate) = (other.entry_templates, meta.entry_templates);
        meta.entry_templates_changed = other.entry_templates_changed;
    }
    meta.entry_templates = resolve_group_ref(root, preferred, alternate);

    for (key, item) in &other.custom_data {
        match meta.custom_data.get(key) {
            None => {
                meta.custom_data.insert(key.clone(), item.clone());
            }
            Some(local) => {
                if force || item.last_modified > local.last_modified {
                    meta.custom_data.insert(key.clone(), item.clone());
                }
            }
        }
    }
}

fn resolve_group_ref(
    root: &Group,
    preferred: Option<ObjectId>,
    alternate: Option<ObjectId>,
) -> Option<ObjectId> {
    if let Some(uuid) = preferred {
        if root.find_group(uuid).is_some() {
            return Some(uuid);
        }
    }
    if let Some(uuid) = alternate {
        if root.find_group(uuid).is_some() {
            return Some(uuid);
        }
    }
    None
}

// ── Custom icons ─────────────────────────────────────────────────────

fn merge_custom_icons(target: &mut Database, source: &Database, mode: MergeMode) {
    for icon in &source.custom_icons {
        match target.custom_icons.iter_mut().find(|i| i.uuid == icon.uuid) {
            None => {
                debug!(uuid = %icon.uuid, "adding source-only custom icon");
                target.custom_icons.push(icon.clone());
            }
            Some(local) => {
                // A missing timestamp counts as older
                let overwrite = match mode {
                    MergeMode::OverwriteExisting => true,
                    MergeMode::OverwriteIfNewer | MergeMode::Synchronize => {
                        icon.last_modified > local.last_modified
                    }
                    MergeMode::None | MergeMode::KeepExisting | MergeMode::CreateNewUuids => false,
                };
                if overwrite {
                    *local = icon.clone();
                }
            }
        }
    }

    if mode == MergeMode::Synchronize {
        // A tombstoned icon is dropped unless it was modified after the
        // deletion; the tombstone is spent either way
        let icons = &mut target.custom_icons;
        target.deleted_objects.retain(|tombstone| {
            match icons.iter().position(|i| i.uuid == tombstone.uuid) {
                None => true,
                Some(index) => {
                    let modified_later = icons[index]
                        .last_modified
                        .is_some_and(|t| t > tombstone.deletion_time);
                    if modified_later {
                        debug!(uuid = %tombstone.uuid, "stale tombstone overridden by newer icon");
                    } else {
                        debug!(uuid = %tombstone.uuid, "removing tombstoned custom icon");
                        icons.remove(index);
                    }
                    false
                }
            }
        });
    }
}
