//! Extended-basic-block partitioning: groups single-entry, multi-exit
//! chains of blocks where every non-entry member has exactly one
//! predecessor within the region.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use super::cfgs::Cfgs;
use crate::cfg::Cfg;
use crate::error::{AnalysisError, Error};
use crate::manager::{Analysis, AnalysisManager};

/// One extended basic block: its entry and every block it subsumes
/// (inclusive of the entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedBasicBlock {
    pub entry: usize,
    pub members: BTreeSet<usize>,
}

/// One [`ExtendedBasicBlock`] per EBB entry, for every non-imported
/// function, in the same order as [`Cfgs`].
pub struct ExtendBasicBlockBuilder;

impl Analysis for ExtendBasicBlockBuilder {
    type Output = Vec<Vec<ExtendedBasicBlock>>;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error> {
        let cfgs = manager.get::<Cfgs>()?;
        cfgs.iter()
            .map(|cfg| {
                if cfg.blocks.is_empty() {
                    return Err(Error::Analysis(AnalysisError::NoBasicBlocks));
                }
                Ok(partition(cfg))
            })
            .collect()
    }
}

/// Counts, for every block, how many predecessors it has — derived
/// directly from the successor sets rather than a separate predecessor
/// map, since only the count is needed.
fn predecessor_counts(cfg: &Cfg) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for block in cfg.blocks.values() {
        for &succ in &block.successors {
            *counts.entry(succ).or_insert(0) += 1;
        }
    }
    counts
}

/// A block is an EBB entry iff it has zero or more-than-one predecessors;
/// only the first block of an EBB may have multiple predecessors.
fn is_entry(index: usize, pred_counts: &BTreeMap<usize, usize>) -> bool {
    !matches!(pred_counts.get(&index), Some(1))
}

fn grow_from(entry: usize, cfg: &Cfg, pred_counts: &BTreeMap<usize, usize>) -> ExtendedBasicBlock {
    let mut members = BTreeSet::new();
    members.insert(entry);
    let mut worklist = alloc::vec![entry];
    while let Some(current) = worklist.pop() {
        for &succ in &cfg.blocks[&current].successors {
            if !is_entry(succ, pred_counts) && members.insert(succ) {
                worklist.push(succ);
            }
        }
    }
    ExtendedBasicBlock { entry, members }
}

pub fn partition(cfg: &Cfg) -> Vec<ExtendedBasicBlock> {
    let pred_counts = predecessor_counts(cfg);
    cfg.blocks
        .keys()
        .copied()
        .filter(|&id| is_entry(id, &pred_counts))
        .map(|entry| grow_from(entry, cfg, &pred_counts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BasicBlock;

    fn block_with(successors: &[usize]) -> BasicBlock {
        BasicBlock { instrs: Vec::new(), successors: successors.iter().copied().collect() }
    }

    #[test]
    fn straight_chain_is_one_ebb() {
        let mut blocks = BTreeMap::new();
        blocks.insert(0, block_with(&[1]));
        blocks.insert(1, block_with(&[2]));
        blocks.insert(2, block_with(&[]));
        let cfg = Cfg { blocks };
        let ebbs = partition(&cfg);
        assert_eq!(ebbs.len(), 1);
        assert_eq!(ebbs[0].entry, 0);
        assert_eq!(ebbs[0].members, [0, 1, 2].into_iter().collect());
    }

    #[test]
    fn merge_point_starts_a_new_ebb() {
        // 0 -> 1, 0 -> 2, 1 -> 3, 2 -> 3 : block 3 has two preds, so it is
        // its own EBB entry even though reached from both branches.
        let mut blocks = BTreeMap::new();
        blocks.insert(0, block_with(&[1, 2]));
        blocks.insert(1, block_with(&[3]));
        blocks.insert(2, block_with(&[3]));
        blocks.insert(3, block_with(&[]));
        let cfg = Cfg { blocks };
        let mut ebbs = partition(&cfg);
        ebbs.sort_by_key(|e| e.entry);
        assert_eq!(ebbs.len(), 2);
        assert_eq!(ebbs[0].entry, 0);
        assert_eq!(ebbs[0].members, [0, 1, 2].into_iter().collect());
        assert_eq!(ebbs[1].entry, 3);
        assert_eq!(ebbs[1].members, [3].into_iter().collect());
    }
}
