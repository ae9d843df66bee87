//! Batch planning: partitions the block forest into upload units that
//! respect the remote service's per-request node ceiling while preserving
//! parent/child relationships across requests.
//!
//! Three passes over the forest:
//! 1. unitize — one unit per structural root, carrying its whole subtree;
//! 2. split — oversized units are broken up: the root travels alone, each
//!    direct child starts a sub-unit anchored at the root, recursively;
//! 3. merge — adjacent units with the same anchor coalesce while the
//!    combined count stays strictly under the ceiling.
//!
//! The planner reads the forest; it never mutates blocks.

use crate::models::{BlockForest, BlockId};
use std::collections::HashSet;

/// Where a unit's top-level blocks attach: the document root, or a block
/// created by an earlier unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    DocumentRoot,
    Block(BlockId),
}

/// One creation request: ordered direct children to attach under the
/// anchor, plus every deeper descendant travelling in the same request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadUnit {
    pub anchor: Anchor,
    pub children: Vec<BlockId>,
    pub descendants: Vec<BlockId>,
}

impl UploadUnit {
    fn root(anchor: Anchor, id: BlockId) -> Self {
        Self {
            anchor,
            children: vec![id],
            descendants: Vec::new(),
        }
    }

    /// Total number of blocks this unit submits.
    pub fn block_count(&self) -> usize {
        self.children.len() + self.descendants.len()
    }
}

/// Plan the forest into an ordered unit sequence. Concatenating the units'
/// blocks reproduces the forest exactly once, and no unit reaches the
/// ceiling.
pub fn plan_units(forest: &BlockForest, ceiling: usize) -> Vec<UploadUnit> {
    let units = unitize(forest);
    let units: Vec<UploadUnit> = units
        .into_iter()
        .flat_map(|unit| split_oversized(forest, unit, ceiling))
        .collect();
    merge_undersized(units, ceiling)
}

/// One unit per block that nothing references as a child; every referenced
/// block rides along with the most recently started unit. Relies on the
/// walker's pre-order emission: a subtree is contiguous after its root.
fn unitize(forest: &BlockForest) -> Vec<UploadUnit> {
    let mut referenced: HashSet<BlockId> = HashSet::new();
    for block in forest.iter() {
        referenced.extend(block.children.iter().copied());
    }

    let mut units: Vec<UploadUnit> = Vec::new();
    for block in forest.iter() {
        if !referenced.contains(&block.id) {
            units.push(UploadUnit::root(Anchor::DocumentRoot, block.id));
        } else if let Some(unit) = units.last_mut() {
            unit.descendants.push(block.id);
        } else {
            debug_assert!(false, "child block emitted before any root");
        }
    }
    units
}

/// Recursively split a unit whose block count meets or exceeds the
/// ceiling. The unit must carry exactly one top-level block with its
/// descendants in depth-first order; each sub-unit rebuilds its descendant
/// list from tree membership, not from positions in the old list.
fn split_oversized(forest: &BlockForest, unit: UploadUnit, ceiling: usize) -> Vec<UploadUnit> {
    if unit.block_count() < ceiling {
        return vec![unit];
    }
    debug_assert_eq!(
        unit.children.len(),
        1,
        "oversized units carry exactly one top-level block"
    );
    let root = unit.children[0];
    let Some(root_block) = forest.get(root) else {
        return vec![unit];
    };
    // A childless block cannot be split further; it passes through even at
    // a degenerate ceiling.
    if root_block.children.is_empty() {
        return vec![unit];
    }

    let mut out = vec![UploadUnit::root(unit.anchor.clone(), root)];
    for &child in &root_block.children {
        let mut descendants = Vec::new();
        collect_subtree(forest, child, &mut descendants);
        let sub = UploadUnit {
            anchor: Anchor::Block(root),
            children: vec![child],
            descendants,
        };
        out.extend(split_oversized(forest, sub, ceiling));
    }
    out
}

/// Depth-first descendants of `id`, excluding `id` itself.
fn collect_subtree(forest: &BlockForest, id: BlockId, out: &mut Vec<BlockId>) {
    if let Some(block) = forest.get(id) {
        for &child in &block.children {
            out.push(child);
            collect_subtree(forest, child, out);
        }
    }
}

/// Coalesce adjacent units that share an anchor, as long as the combined
/// block count stays strictly under the ceiling.
fn merge_undersized(units: Vec<UploadUnit>, ceiling: usize) -> Vec<UploadUnit> {
    let mut merged: Vec<UploadUnit> = Vec::new();
    for unit in units {
        match merged.last_mut() {
            Some(last)
                if last.anchor == unit.anchor
                    && last.block_count() + unit.block_count() < ceiling =>
            {
                last.children.extend(unit.children);
                last.descendants.extend(unit.descendants);
            }
            _ => merged.push(unit),
        }
    }
    merged
}
