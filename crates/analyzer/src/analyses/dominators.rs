//! Dominator computation: classical iterative bit-vector dataflow over a
//! CFG's predecessor relation.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::cfgs::Cfgs;
use crate::bitset::BitSet;
use crate::cfg::{Cfg, ENTER_BLOCK};
use crate::error::{AnalysisError, Error};
use crate::manager::{Analysis, AnalysisManager};

/// Block id → the set of block ids that dominate it, for one function.
pub type DomSets = BTreeMap<usize, BitSet>;

/// Dominator sets for every non-imported function, in the same order as
/// [`Cfgs`].
pub struct DomBuilder;

impl Analysis for DomBuilder {
    type Output = Vec<DomSets>;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error> {
        let cfgs = manager.get::<Cfgs>()?;
        cfgs.iter()
            .map(|cfg| {
                if cfg.blocks.is_empty() {
                    return Err(Error::Analysis(AnalysisError::NoBasicBlocks));
                }
                Ok(dominators(cfg))
            })
            .collect()
    }
}

/// Builds the predecessor map implied by every block's successor set.
fn predecessors(cfg: &Cfg) -> BTreeMap<usize, Vec<usize>> {
    let mut preds: BTreeMap<usize, Vec<usize>> = cfg.blocks.keys().map(|&id| (id, Vec::new())).collect();
    for (&from, block) in &cfg.blocks {
        for &to in &block.successors {
            preds.entry(to).or_default().push(from);
        }
    }
    preds
}

/// Computes, for each block, the bit set of blocks that dominate it.
///
/// `D[entry] = {entry}`; every other block starts as "dominated by
/// everything" and shrinks monotonically until a full pass makes no
/// change, at which point the fixed point is reached.
pub fn dominators(cfg: &Cfg) -> DomSets {
    let bit_size = cfg.blocks.keys().copied().max().map_or(0, |m| m + 1);
    let preds = predecessors(cfg);

    let mut dom: DomSets = cfg
        .blocks
        .keys()
        .map(|&id| {
            let set = if id == ENTER_BLOCK {
                let mut s = BitSet::new(bit_size);
                s.set(id, true);
                s
            } else {
                BitSet::all_ones(bit_size)
            };
            (id, set)
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for &id in cfg.blocks.keys() {
            if id == ENTER_BLOCK {
                continue;
            }
            let block_preds = &preds[&id];
            let mut new_set = if block_preds.is_empty() {
                BitSet::new(bit_size)
            } else {
                let mut iter = block_preds.iter();
                let first = dom[iter.next().unwrap()].clone();
                iter.fold(first, |acc, p| &acc & &dom[p])
            };
            new_set.set(id, true);
            if new_set != dom[&id] {
                dom.insert(id, new_set);
                changed = true;
            }
        }
    }
    dom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BasicBlock;
    use wsa_ir::{Instr, Opcode, Payload};

    fn empty_block() -> BasicBlock {
        BasicBlock { instrs: Vec::new(), successors: Default::default() }
    }

    /// The diamond from the dominators worked example: 0 entry, 2 then, 3
    /// else, 4 merge, 1 exit; edges 0→2, 0→3, 2→4, 3→4, 4→1.
    #[test]
    fn diamond_dominators_match_worked_example() {
        let mut blocks = BTreeMap::new();
        let mut b0 = empty_block();
        b0.successors.extend([2, 3]);
        let mut b2 = empty_block();
        b2.instrs.push(Instr::new(Opcode::Nop, Payload::None));
        b2.successors.insert(4);
        let mut b3 = empty_block();
        b3.instrs.push(Instr::new(Opcode::Nop, Payload::None));
        b3.successors.insert(4);
        let mut b4 = empty_block();
        b4.instrs.push(Instr::new(Opcode::Nop, Payload::None));
        b4.successors.insert(1);
        let b1 = empty_block();
        blocks.insert(0, b0);
        blocks.insert(1, b1);
        blocks.insert(2, b2);
        blocks.insert(3, b3);
        blocks.insert(4, b4);
        let cfg = Cfg { blocks };

        let dom = dominators(&cfg);
        assert_eq!(dom[&4].iter_ones().collect::<Vec<_>>(), vec![0, 4]);
        assert_eq!(dom[&1].iter_ones().collect::<Vec<_>>(), vec![0, 1, 4]);
        assert_eq!(dom[&2].iter_ones().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(dom[&3].iter_ones().collect::<Vec<_>>(), vec![0, 3]);
    }
}
