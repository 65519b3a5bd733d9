//! Tree-height balancing: rebuilds maximal runs of "expression-tree"
//! opcodes within a basic block into a binary tree, then rebalances every
//! homogeneous commutative-and-associative sub-region so it combines its
//! leaves in Huffman-like minimum-depth order.

use alloc::collections::{BTreeSet, BinaryHeap};
use alloc::vec::Vec;
use core::cmp::Reverse;

use super::cfgs::Cfgs;
use crate::error::{AnalysisError, Error};
use crate::manager::{Analysis, AnalysisManager};
use wsa_ir::{Instr, Opcode};

/// The opcodes eligible for extraction into an expression tree. The
/// reference implementation hard-codes four opcodes; this set is
/// configurable but should stay conservative — no side effects, no
/// control-flow.
#[derive(Clone, Debug)]
pub struct Options {
    pub tree_opcodes: BTreeSet<Opcode>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tree_opcodes: [Opcode::GlobalGet, Opcode::I32Const, Opcode::I32Mul, Opcode::I32Add]
                .into_iter()
                .collect(),
        }
    }
}

/// One node of a reconstructed expression tree. `rank` is `-1` until this
/// node has been folded into a balanced sub-tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub instr: Instr,
    pub rank: i32,
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl TreeNode {
    pub fn has_children(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }
}

/// An arena-backed binary tree reconstructed from one maximal run of
/// tree-node opcodes, after balancing.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `1 + max(height(left), height(right))`, `0` for an empty tree.
    pub fn height(&self) -> usize {
        fn go(tree: &Tree, index: usize) -> usize {
            let node = tree.node(index);
            let l = node.left.map_or(0, |l| go(tree, l));
            let r = node.right.map_or(0, |r| go(tree, r));
            1 + l.max(r)
        }
        if self.nodes.is_empty() {
            0
        } else {
            go(self, self.root())
        }
    }

    fn opcode_at(&self, index: usize) -> Opcode {
        self.nodes[index].instr.opcode()
    }
}

/// Whether node `index` is a *balancing root*: the tree root, or a node
/// with two children whose opcode differs from its parent's — the
/// topmost node of a homogeneous operator region.
fn is_balancing_root(tree: &Tree, index: usize) -> bool {
    let node = tree.node(index);
    if !node.has_children() {
        return false;
    }
    match node.parent {
        None => true,
        Some(parent) => tree.opcode_at(parent) != tree.opcode_at(index),
    }
}

fn leaf_rank(opcode: Opcode) -> Result<i32, Error> {
    match opcode {
        Opcode::I32Const => Ok(0),
        Opcode::LocalGet => Ok(1),
        Opcode::GlobalGet => Ok(2),
        other => Err(Error::Analysis(AnalysisError::UnrankedLeaf(other))),
    }
}

/// Reconstructs the expression tree for one maximal run of tree-node
/// opcodes by walking it in reverse and threading a stack of
/// still-missing-operand frames, as a stack machine's producer/consumer
/// relationship implies.
fn build_tree(run: &[Instr]) -> Tree {
    assert!(!run.is_empty(), "extract_runs never yields an empty run");

    struct Frame {
        missing: u32,
        tree_index: usize,
    }

    let root_instr = run.last().unwrap().clone();
    let mut nodes = alloc::vec![TreeNode {
        instr: root_instr.clone(),
        rank: -1,
        parent: None,
        left: None,
        right: None,
    }];
    let mut stack = Vec::new();
    if root_instr.get_operand_count() != 0 {
        stack.push(Frame { missing: root_instr.get_operand_count(), tree_index: 0 });
    }

    for instr in run[..run.len() - 1].iter().rev() {
        let (missing, parent) = {
            let top = stack.last().unwrap();
            (top.missing, top.tree_index)
        };
        let index = nodes.len();
        nodes.push(TreeNode { instr: instr.clone(), rank: -1, parent: Some(parent), left: None, right: None });
        match missing {
            1 => nodes[parent].right = Some(index),
            2 => nodes[parent].left = Some(index),
            other => unreachable!("stack-machine run has a node missing {other} operands"),
        }

        stack.last_mut().unwrap().missing -= instr.get_result_count();
        while matches!(stack.last(), Some(f) if f.missing == 0) {
            stack.pop();
        }
        if instr.get_operand_count() != 0 {
            stack.push(Frame { missing: instr.get_operand_count(), tree_index: index });
        }
    }
    assert!(stack.is_empty(), "malformed expression run: operand stack not empty at its start");

    Tree { nodes }
}

/// Splits a block's instructions into maximal consecutive runs of
/// `options.tree_opcodes`, dropping the straight-line instructions
/// between them.
fn extract_runs(instrs: &[Instr], tree_opcodes: &BTreeSet<Opcode>) -> Vec<Vec<Instr>> {
    let mut runs = Vec::new();
    let mut current: Vec<Instr> = Vec::new();
    for instr in instrs {
        if tree_opcodes.contains(&instr.opcode()) {
            current.push(instr.clone());
        } else if !current.is_empty() {
            runs.push(core::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// DFS from `index` (a child of some balancing root): leaves are ranked
/// and queued, nested balancing roots are balanced first and then queued,
/// and internal same-opcode operator nodes are collected as reusable
/// slots for [`rebuild`].
fn flatten(index: usize, rank_queue: &mut BinaryHeap<Reverse<(i32, usize)>>, tree: &mut Tree) -> Result<BTreeSet<usize>, Error> {
    let mut available_op_slot = BTreeSet::new();
    let has_children = tree.node(index).has_children();

    if !has_children {
        let rank = leaf_rank(tree.opcode_at(index))?;
        tree.nodes[index].rank = rank;
        rank_queue.push(Reverse((rank, index)));
    } else if is_balancing_root(tree, index) {
        balance(index, tree)?;
        rank_queue.push(Reverse((tree.node(index).rank, index)));
    } else {
        let (left, right) = {
            let node = tree.node(index);
            (node.left.expect("internal operator node has a left child"), node.right.expect("internal operator node has a right child"))
        };
        available_op_slot.insert(index);
        available_op_slot.extend(flatten(left, rank_queue, tree)?);
        available_op_slot.extend(flatten(right, rank_queue, tree)?);
    }
    Ok(available_op_slot)
}

/// Huffman-style combination: repeatedly pairs the two lowest-rank items,
/// reusing a collected operator slot for every pairing but the last
/// (which attaches directly to `root_index`).
fn rebuild(root_index: usize, mut available_op_slot: BTreeSet<usize>, rank_queue: &mut BinaryHeap<Reverse<(i32, usize)>>, tree: &mut Tree) {
    loop {
        let Reverse((rank_l, l)) = rank_queue.pop().expect("rank_queue has at least two items entering rebuild");
        let Reverse((rank_r, r)) = rank_queue.pop().expect("rank_queue has at least two items entering rebuild");

        if rank_queue.is_empty() {
            link(tree, root_index, l, r);
            tree.nodes[root_index].rank = rank_l + rank_r;
            return;
        }

        let slot = *available_op_slot.iter().next().expect("available_op_slot is exhausted exactly when rank_queue empties");
        available_op_slot.remove(&slot);
        link(tree, slot, l, r);
        tree.nodes[slot].rank = rank_l + rank_r;
        rank_queue.push(Reverse((rank_l + rank_r, slot)));
    }
}

fn link(tree: &mut Tree, parent: usize, left: usize, right: usize) {
    tree.nodes[parent].left = Some(left);
    tree.nodes[parent].right = Some(right);
    tree.nodes[left].parent = Some(parent);
    tree.nodes[right].parent = Some(parent);
}

/// Rebalances the homogeneous operator region rooted at `root_index`, if
/// it has not already been folded into an enclosing region's balance.
fn balance(root_index: usize, tree: &mut Tree) -> Result<(), Error> {
    if tree.node(root_index).rank >= 0 {
        return Ok(());
    }
    let (left, right) = {
        let node = tree.node(root_index);
        (node.left.expect("balancing root has a left child"), node.right.expect("balancing root has a right child"))
    };
    let mut rank_queue = BinaryHeap::new();
    let mut available_op_slot = flatten(left, &mut rank_queue, tree)?;
    available_op_slot.extend(flatten(right, &mut rank_queue, tree)?);
    rebuild(root_index, available_op_slot, &mut rank_queue, tree);
    Ok(())
}

/// Every balancing root in `tree`, largest subtree first (a smaller
/// arena index is a proxy for an earlier-allocated, larger ancestor
/// subtree).
fn mark_roots(tree: &Tree) -> BinaryHeap<Reverse<usize>> {
    let mut roots = BinaryHeap::new();
    roots.push(Reverse(tree.root()));
    for i in 1..tree.len() {
        if is_balancing_root(tree, i) {
            roots.push(Reverse(i));
        }
    }
    roots
}

/// Builds and balances every expression tree found in one run.
fn balance_run(run: &[Instr]) -> Result<Tree, Error> {
    let mut tree = build_tree(run);
    let mut roots = mark_roots(&tree);
    while let Some(Reverse(root)) = roots.pop() {
        balance(root, &mut tree)?;
    }
    Ok(tree)
}

/// Extracts and balances every expression tree in every basic block of
/// every CFG, with the default [`Options`]. For a custom opcode
/// whitelist, call [`balance_module`] directly.
pub struct TreeHeightBalancing;

impl Analysis for TreeHeightBalancing {
    type Output = Vec<Tree>;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error> {
        let cfgs = manager.get::<Cfgs>()?;
        balance_module(&cfgs, &Options::default())
    }
}

pub fn balance_module(cfgs: &[crate::cfg::Cfg], options: &Options) -> Result<Vec<Tree>, Error> {
    let mut trees = Vec::new();
    for cfg in cfgs {
        for block in cfg.blocks.values() {
            for run in extract_runs(&block.instrs, &options.tree_opcodes) {
                trees.push(balance_run(&run)?);
            }
        }
    }
    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsa_ir::Payload;

    fn leaf_const(v: i32) -> Instr {
        Instr::new(Opcode::I32Const, Payload::I32(v))
    }

    fn add() -> Instr {
        Instr::new(Opcode::I32Add, Payload::None)
    }

    /// `1 1 + 1 + 1 +` (left-deep sum of four constants) rebalances to a
    /// depth-3 tree instead of depth-4, per the spec's worked example.
    #[test]
    fn left_deep_sum_of_four_constants_balances_to_log_depth() {
        let run = alloc::vec![
            leaf_const(1),
            leaf_const(1),
            add(),
            leaf_const(1),
            add(),
            leaf_const(1),
            add(),
        ];
        let tree = balance_run(&run).unwrap();
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.node(tree.root()).instr.opcode(), Opcode::I32Add);

        let mut leaves = Vec::new();
        fn collect(tree: &Tree, index: usize, out: &mut Vec<i32>) {
            let node = tree.node(index);
            if !node.has_children() {
                if let Payload::I32(v) = node.instr.payload() {
                    out.push(*v);
                }
            } else {
                collect(tree, node.left.unwrap(), out);
                collect(tree, node.right.unwrap(), out);
            }
        }
        collect(&tree, tree.root(), &mut leaves);
        leaves.sort();
        assert_eq!(leaves, alloc::vec![1, 1, 1, 1]);
    }

    #[test]
    fn single_leaf_run_is_a_one_node_tree() {
        let tree = balance_run(&[leaf_const(7)]).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn mul_and_add_regions_balance_independently() {
        // (1 * 1) + (1 * 1 * 1): the add is the outer root, each operand
        // a separate homogeneous mul region.
        let run = alloc::vec![
            leaf_const(1),
            leaf_const(1),
            Instr::new(Opcode::I32Mul, Payload::None),
            leaf_const(1),
            leaf_const(1),
            Instr::new(Opcode::I32Mul, Payload::None),
            leaf_const(1),
            Instr::new(Opcode::I32Mul, Payload::None),
            add(),
        ];
        let tree = balance_run(&run).unwrap();
        assert_eq!(tree.node(tree.root()).instr.opcode(), Opcode::I32Add);
    }
}
