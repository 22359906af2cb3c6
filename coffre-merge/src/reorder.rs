//! Sibling reordering pass.
//!
//! Each group's subgroup list and entry list is reconciled
//! independently. Siblings whose relative order already agrees in both
//! pools form a block and move as a unit; blocks are then arbitrated
//! recursively around the most recently moved block, following the
//! sequence order of whichever pool that move came from. Re-running
//! the pass on an already consistent list is a no-op.

use crate::error::MergeResult;
use crate::merge::{ensure_continue, ProgressSink};
use crate::pool::{ItemKind, ObjectPool};
use coffre_model::{Database, StructureItem};
use coffre_types::{ObjectId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Target,
    Source,
}

/// A maximal run of siblings already contiguous and identically
/// ordered in both pools.
struct Block {
    /// Indices into the pre-reorder sibling list.
    members: Vec<usize>,
    /// First member's uuid; its pool sequence stands for the block.
    primary: ObjectId,
    /// Newest pool-derived move stamp across the members.
    location_changed: Timestamp,
    /// Which pool that stamp came from.
    winner: Side,
}

pub(crate) fn reorder_tree(
    target: &mut Database,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
    progress: Option<&dyn ProgressSink>,
) -> MergeResult<()> {
    for uuid in target.root.group_ids() {
        ensure_continue(progress)?;
        let Some(path) = target.root.path_to(uuid) else {
            continue;
        };
        let group = target.root.descend_mut(&path);
        reorder_siblings(&mut group.groups, ItemKind::Group, pool_target, pool_source);
        reorder_siblings(&mut group.entries, ItemKind::Entry, pool_target, pool_source);
    }
    Ok(())
}

fn reorder_siblings<T: StructureItem>(
    items: &mut Vec<T>,
    kind: ItemKind,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
) {
    if items.len() <= 1 {
        return;
    }
    let blocks = partition_blocks(items, kind, pool_target, pool_source);
    if blocks.len() <= 1 {
        return;
    }

    let scan: Vec<usize> = (0..blocks.len()).collect();
    let order = arrange(&blocks, scan, pool_target, pool_source);
    let flat: Vec<usize> = order
        .iter()
        .flat_map(|&b| blocks[b].members.iter().copied())
        .collect();
    if flat.iter().copied().eq(0..items.len()) {
        return;
    }

    let mut slots: Vec<Option<T>> = std::mem::take(items).into_iter().map(Some).collect();
    for index in flat {
        if let Some(item) = slots[index].take() {
            items.push(item);
        }
    }
    // Anything a malformed permutation left behind stays in the list
    for item in slots.into_iter().flatten() {
        items.push(item);
    }
}

fn partition_blocks<T: StructureItem>(
    items: &[T],
    kind: ItemKind,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let uuid = item.uuid();
        let extends_previous = i > 0 && {
            let prev = items[i - 1].uuid();
            adjacent_in(pool_target, prev, uuid, kind) && adjacent_in(pool_source, prev, uuid, kind)
        };
        match blocks.last_mut() {
            Some(block) if extends_previous => block.members.push(i),
            _ => blocks.push(Block {
                members: vec![i],
                primary: uuid,
                location_changed: Timestamp::EPOCH,
                winner: Side::Target,
            }),
        }
    }

    for block in &mut blocks {
        for &i in &block.members {
            let uuid = items[i].uuid();
            if let Some(slot) = pool_target.get_by_uuid(uuid) {
                if slot.location_changed > block.location_changed {
                    block.location_changed = slot.location_changed;
                    block.winner = Side::Target;
                }
            }
            if let Some(slot) = pool_source.get_by_uuid(uuid) {
                if slot.location_changed > block.location_changed {
                    block.location_changed = slot.location_changed;
                    block.winner = Side::Source;
                }
            }
        }
    }
    blocks
}

/// True if `prev` and `cur` are direct neighbors, in that order, of
/// the same sibling list in the pool's snapshot.
fn adjacent_in(pool: &ObjectPool<'_>, prev: ObjectId, cur: ObjectId, kind: ItemKind) -> bool {
    let (Some(a), Some(b)) = (pool.get_by_uuid(prev), pool.get_by_uuid(cur)) else {
        return false;
    };
    if a.parent.is_none() || a.parent != b.parent {
        return false;
    }
    let Some(order) = pool.sibling_order(cur, kind) else {
        return false;
    };
    let prev_at = order.iter().position(|&u| u == prev);
    let cur_at = order.iter().position(|&u| u == cur);
    matches!((prev_at, cur_at), (Some(p), Some(c)) if p + 1 == c)
}

/// Quickselect-style arbitration: the block with the newest move stamp
/// pivots, the rest partition around it by the winning pool's sequence
/// order, and each side recurses.
fn arrange(
    blocks: &[Block],
    scan: Vec<usize>,
    pool_target: &ObjectPool<'_>,
    pool_source: &ObjectPool<'_>,
) -> Vec<usize> {
    if scan.len() <= 1 {
        return scan;
    }

    // First scanned wins ties
    let mut pivot_pos = 0;
    for (pos, &b) in scan.iter().enumerate() {
        if blocks[b].location_changed > blocks[scan[pivot_pos]].location_changed {
            pivot_pos = pos;
        }
    }
    let pivot = scan[pivot_pos];
    let winning_pool = match blocks[pivot].winner {
        Side::Target => pool_target,
        Side::Source => pool_source,
    };
    let pivot_sequence = winning_pool.sequence_of(blocks[pivot].primary);

    let mut before = Vec::new();
    let mut after = Vec::new();
    for (pos, &b) in scan.iter().enumerate() {
        if pos == pivot_pos {
            continue;
        }
        let goes_before = match (winning_pool.sequence_of(blocks[b].primary), pivot_sequence) {
            (Some(sequence), Some(pivot_sequence)) => sequence < pivot_sequence,
            // Unknown to the winning pool: keep the scan order
            _ => pos < pivot_pos,
        };
        if goes_before {
            before.push(b);
        } else {
            after.push(b);
        }
    }

    let mut out = arrange(blocks, before, pool_target, pool_source);
    out.push(pivot);
    out.extend(arrange(blocks, after, pool_target, pool_source));
    out
}
