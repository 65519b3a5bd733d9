//! Control-flow graph reconstruction from a function's structured Wasm
//! control operators.
//!
//! Wasm has no unstructured `goto`; `block`/`loop`/`if`/`else`/`end` nest
//! like braces and `br`/`br_if`/`br_table`/`return` only ever jump to a
//! target named by nesting depth. [`Cfg::build`] walks that structure with
//! a frame stack mirroring the nesting and emits an explicit graph of
//! [`BasicBlock`]s, then [`Cfg::simplify`] collapses the bookkeeping blocks
//! the construction left behind.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::error::CfgError;
use crate::module::Function;
use wsa_ir::{Instr, Opcode};

/// The function's single entry block. Always present, even for a function
/// whose body is just `end`.
pub const ENTER_BLOCK: usize = 0;
/// The function's single exit block. `return`, `unreachable`, and falling
/// off the end of the outermost block all eventually reach it.
pub const EXIT_BLOCK: usize = 1;

/// A maximal straight-line run of instructions with one entry and explicit
/// successor edges; the unit the rest of the pipeline operates on.
#[derive(Debug, Default, Clone)]
pub struct BasicBlock {
    pub instrs: Vec<Instr>,
    pub successors: BTreeSet<usize>,
}

/// A function's reconstructed control-flow graph, keyed by block index.
///
/// Indices are not contiguous after [`Cfg::simplify`] removes blocks; treat
/// the map, not the index range, as authoritative.
#[derive(Debug, Default, Clone)]
pub struct Cfg {
    pub blocks: BTreeMap<usize, BasicBlock>,
}

impl Cfg {
    /// Builds and simplifies the CFG for a single function's instruction
    /// stream.
    pub fn build(func: &Function) -> Result<Self, CfgError> {
        let mut builder = Builder::new();
        builder.run(&func.instrs)?;
        let mut cfg = Cfg { blocks: builder.blocks };
        cfg.simplify();
        Ok(cfg)
    }

    /// Repeatedly collapses blocks with no instructions and exactly one
    /// successor into that successor, redirecting every incoming edge,
    /// until no such block remains.
    fn simplify(&mut self) {
        let mut round = 0u32;
        loop {
            tracing::debug!(round, blocks = self.blocks.len(), "cfg simplify pass");
            if !self.clean_pass() {
                break;
            }
            round += 1;
        }
    }

    fn clean_pass(&mut self) -> bool {
        let mut replaced: BTreeMap<usize, usize> = BTreeMap::new();
        for (&index, block) in self.blocks.iter() {
            if index == ENTER_BLOCK || index == EXIT_BLOCK {
                continue; // both must survive simplification per the post-build invariants
            }
            if block.instrs.is_empty() && block.successors.len() == 1 {
                let only = *block.successors.iter().next().unwrap();
                replaced.insert(index, only);
            }
        }
        if replaced.is_empty() {
            return false;
        }

        let mut resolved = replaced.clone();
        for target in resolved.values_mut() {
            let mut guard = 0usize;
            while let Some(&next) = replaced.get(target) {
                *target = next;
                guard += 1;
                if guard > replaced.len() {
                    break; // defensive: a cycle of empty blocks would otherwise spin forever
                }
            }
        }

        for block in self.blocks.values_mut() {
            block.successors = block
                .successors
                .iter()
                .map(|s| resolved.get(s).copied().unwrap_or(*s))
                .collect();
        }
        for old in replaced.keys() {
            self.blocks.remove(old);
        }
        true
    }
}

/// A structured-control frame: what `end` (and, for `br`/`br_if`, a nesting
/// depth) resolves to while this frame is open.
enum Frame {
    Func { target: usize },
    Block { target: usize },
    Loop { header: usize, target: usize },
    If { last_block: usize, target: usize },
}

impl Frame {
    /// Where a `br`/`br_if` naming this frame's depth jumps to: the loop
    /// header for `loop`, the post-`end` block for everything else.
    fn br_target(&self) -> usize {
        match *self {
            Frame::Func { target } | Frame::Block { target } | Frame::If { target, .. } => target,
            Frame::Loop { header, .. } => header,
        }
    }

    /// Where control flows once this frame's `end` is reached.
    fn end_target(&self) -> usize {
        match *self {
            Frame::Func { target }
            | Frame::Block { target }
            | Frame::Loop { target, .. }
            | Frame::If { target, .. } => target,
        }
    }
}

struct Builder {
    blocks: BTreeMap<usize, BasicBlock>,
    counter: usize,
    current: usize,
    frames: Vec<Frame>,
}

impl Builder {
    fn new() -> Self {
        let mut blocks = BTreeMap::new();
        blocks.insert(ENTER_BLOCK, BasicBlock::default());
        blocks.insert(EXIT_BLOCK, BasicBlock::default());
        Self {
            blocks,
            counter: EXIT_BLOCK,
            current: ENTER_BLOCK,
            frames: Vec::new(),
        }
    }

    fn append_block(&mut self) -> usize {
        self.counter += 1;
        self.blocks.insert(self.counter, BasicBlock::default());
        self.counter
    }

    fn push_instr(&mut self, block: usize, instr: Instr) {
        self.blocks.get_mut(&block).expect("block was just created").instrs.push(instr);
    }

    fn connect(&mut self, from: usize, to: usize) {
        self.blocks.get_mut(&from).expect("block exists").successors.insert(to);
    }

    fn run(&mut self, instrs: &[Instr]) -> Result<(), CfgError> {
        self.frames.push(Frame::Func { target: EXIT_BLOCK });

        for instr in instrs {
            match instr.opcode() {
                Opcode::Block => {
                    let this_block = self.append_block();
                    let next_block = self.append_block();
                    self.connect(self.current, this_block);
                    self.current = this_block;
                    self.frames.push(Frame::Block { target: next_block });
                }
                Opcode::Loop => {
                    let this_block = self.append_block();
                    let next_block = self.append_block();
                    self.connect(self.current, this_block);
                    self.current = this_block;
                    self.frames.push(Frame::Loop { header: this_block, target: next_block });
                }
                Opcode::If => {
                    let last_block = self.current;
                    let then_block = self.append_block();
                    let next_block = self.append_block();
                    self.connect(self.current, then_block);
                    self.push_instr(self.current, instr.clone());
                    self.current = then_block;
                    self.frames.push(Frame::If { last_block, target: next_block });
                }
                Opcode::Else => {
                    let (last_block, target) = match self.frames.last() {
                        Some(Frame::If { last_block, target }) => (*last_block, *target),
                        _ => return Err(CfgError::UnbalancedFrames),
                    };
                    let else_block = self.append_block();
                    self.connect(self.current, target); // then-branch falls through to after-if
                    self.connect(last_block, else_block); // condition block enters else-branch
                    self.current = else_block;
                }
                Opcode::End => {
                    let frame = self.frames.pop().ok_or(CfgError::UnbalancedFrames)?;
                    let target = frame.end_target();
                    self.connect(self.current, target);
                    if let Frame::If { last_block, .. } = frame {
                        // no `else`: the condition block can fall straight through
                        self.connect(last_block, target);
                    }
                    self.current = target;
                }
                Opcode::Unreachable | Opcode::Return => {
                    let next_block = self.append_block();
                    let target = self.frames.first().ok_or(CfgError::UnbalancedFrames)?.end_target();
                    self.connect(self.current, target);
                    self.push_instr(self.current, instr.clone());
                    self.current = next_block;
                }
                Opcode::Br => {
                    let next_block = self.append_block();
                    let depth = instr.branch_depth().ok_or(CfgError::UnbalancedFrames)? as usize;
                    let target = self.frame_at_depth(depth)?.br_target();
                    self.connect(self.current, target);
                    self.push_instr(self.current, instr.clone());
                    self.current = next_block;
                }
                Opcode::BrIf => {
                    let next_block = self.append_block();
                    let depth = instr.branch_depth().ok_or(CfgError::UnbalancedFrames)? as usize;
                    let target = self.frame_at_depth(depth)?.br_target();
                    self.connect(self.current, next_block);
                    self.connect(self.current, target);
                    self.push_instr(self.current, instr.clone());
                    self.current = next_block;
                }
                Opcode::BrTable => return Err(CfgError::BrTableUnsupported),
                _ => self.push_instr(self.current, instr.clone()),
            }
        }

        if !self.frames.is_empty() {
            return Err(CfgError::UnbalancedFrames);
        }
        Ok(())
    }

    fn frame_at_depth(&self, depth: usize) -> Result<&Frame, CfgError> {
        let len = self.frames.len();
        let idx = len.checked_sub(1 + depth).ok_or(CfgError::UnbalancedFrames)?;
        self.frames.get(idx).ok_or(CfgError::UnbalancedFrames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsa_core::FuncType;
    use wsa_ir::Payload;

    fn instr(opcode: Opcode) -> Instr {
        Instr::new(opcode, Payload::None)
    }

    fn br(depth: u32) -> Instr {
        Instr::new(Opcode::Br, Payload::Index(depth))
    }

    fn func(instrs: Vec<Instr>) -> Function {
        Function::defined(FuncType::new(Vec::new(), Vec::new()), instrs)
    }

    #[test]
    fn straight_line_function_has_one_block_before_end() {
        let f = func(vec![instr(Opcode::I32Add), instr(Opcode::End)]);
        let cfg = Cfg::build(&f).unwrap();
        // ENTER_BLOCK survives simplification (empty, one successor) rather
        // than being collapsed into it, so it stays present per the
        // post-build invariant; the instruction itself lands in the one
        // other, non-empty block.
        assert!(cfg.blocks.contains_key(&ENTER_BLOCK));
        assert!(cfg.blocks.contains_key(&EXIT_BLOCK));
        let non_empty: Vec<_> = cfg.blocks.values().filter(|b| !b.instrs.is_empty()).collect();
        assert_eq!(non_empty.len(), 1);
        assert_eq!(non_empty[0].instrs.len(), 1);
    }

    #[test]
    fn if_without_else_connects_condition_block_to_join() {
        let f = func(vec![
            instr(Opcode::If),
            instr(Opcode::Nop),
            instr(Opcode::End),
            instr(Opcode::End),
        ]);
        let cfg = Cfg::build(&f).unwrap();
        assert!(!cfg.blocks.is_empty());
    }

    #[test]
    fn br_table_is_rejected() {
        let f = func(vec![Instr::new(Opcode::BrTable, Payload::BrTable { targets: Vec::new(), default: 0 }), instr(Opcode::End)]);
        assert!(matches!(Cfg::build(&f), Err(CfgError::BrTableUnsupported)));
    }

    #[test]
    fn br_out_of_range_depth_is_unbalanced() {
        let f = func(vec![br(5), instr(Opcode::End)]);
        assert!(matches!(Cfg::build(&f), Err(CfgError::UnbalancedFrames)));
    }

    #[test]
    fn loop_back_edge_targets_the_header() {
        let f = func(vec![
            instr(Opcode::Loop),
            br(0),
            instr(Opcode::End),
            instr(Opcode::End),
        ]);
        let cfg = Cfg::build(&f).unwrap();
        let has_back_edge = cfg.blocks.values().any(|b| {
            b.instrs.iter().any(|i| i.opcode() == Opcode::Br)
                && b.successors.len() >= 1
        });
        assert!(has_back_edge);
    }

    /// spec.md §8 scenario 4: a function body whose very first instruction
    /// opens a structured block leaves ENTER_BLOCK empty with exactly one
    /// successor, which must not make it a simplification candidate.
    #[test]
    fn enter_and_exit_blocks_survive_simplification_when_function_opens_with_a_loop() {
        let f = func(vec![
            instr(Opcode::Loop),
            instr(Opcode::I32Const),
            br(0),
            instr(Opcode::End),
            instr(Opcode::End),
        ]);
        let cfg = Cfg::build(&f).unwrap();
        assert!(cfg.blocks.contains_key(&ENTER_BLOCK));
        assert!(cfg.blocks.contains_key(&EXIT_BLOCK));
    }
}
