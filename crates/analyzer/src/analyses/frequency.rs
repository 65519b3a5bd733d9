//! High-frequency sub-expression census: an n-gram count of opcode
//! sequences across every basic block in the module, reported as the
//! `statistic_num` most frequent sequences by percentage of total
//! instructions.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::cfgs::Cfgs;
use crate::error::{AnalysisError, Error};
use crate::manager::{Analysis, AnalysisManager};
use wsa_ir::Opcode;

/// `depth` and `statistic_num` default to the reference implementation's
/// values; both must be positive.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub depth: usize,
    pub statistic_num: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { depth: 16, statistic_num: 128 }
    }
}

/// One ranked n-gram: the opcode sequence, its raw occurrence count, and
/// its share of all instructions in the module.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyEntry {
    pub opcodes: Vec<Opcode>,
    pub count: u64,
    pub percent: f64,
}

/// A trie keyed by opcode sequences, each node optionally carrying a visit
/// count. Mirrors the reference's arena-of-nodes `Trie<K, V>`: children
/// are looked up by key, and a node's own count (not its children's) is
/// what a completed path accumulates.
struct Trie {
    nodes: Vec<Node>,
}

struct Node {
    children: BTreeMap<Opcode, usize>,
    count: u64,
}

impl Trie {
    fn new() -> Self {
        Self { nodes: alloc::vec![Node { children: BTreeMap::new(), count: 0 }] }
    }

    /// Walks (creating as needed) the path named by `path`, then
    /// increments that node's own count by one.
    fn bump(&mut self, path: &[Opcode]) {
        let mut current = 0usize;
        for &opcode in path {
            current = match self.nodes[current].children.get(&opcode).copied() {
                Some(child) => child,
                None => {
                    self.nodes.push(Node { children: BTreeMap::new(), count: 0 });
                    let child = self.nodes.len() - 1;
                    self.nodes[current].children.insert(opcode, child);
                    child
                }
            };
        }
        self.nodes[current].count += 1;
    }

    /// Every `(path, count)` pair for nodes with a non-zero count, in no
    /// particular order.
    fn entries(&self) -> Vec<(Vec<Opcode>, u64)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.walk(0, &mut path, &mut out);
        out
    }

    fn walk(&self, index: usize, path: &mut Vec<Opcode>, out: &mut Vec<(Vec<Opcode>, u64)>) {
        let node = &self.nodes[index];
        if node.count > 0 {
            out.push((path.clone(), node.count));
        }
        for (&opcode, &child) in &node.children {
            path.push(opcode);
            self.walk(child, path, out);
            path.pop();
        }
    }
}

/// Census of the module's most frequent opcode n-grams, computed with the
/// [`Options::default`] depth and top-K count. To use a custom
/// [`Options`], call [`census`] directly instead of going through the
/// [`Analysis`] memoization (which is fixed to one configuration per
/// manager).
pub struct HighFrequencySubExpr;

impl Analysis for HighFrequencySubExpr {
    type Output = Vec<FrequencyEntry>;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error> {
        let cfgs = manager.get::<Cfgs>()?;
        census(&cfgs, Options::default())
    }
}

/// Runs the census over already-built CFGs with an explicit [`Options`].
pub fn census(cfgs: &[crate::cfg::Cfg], options: Options) -> Result<Vec<FrequencyEntry>, Error> {
    let depth = options.depth.max(1);
    let mut trie = Trie::new();
    let mut total: u64 = 0;

    for cfg in cfgs {
        for block in cfg.blocks.values() {
            let mut window: Vec<Opcode> = Vec::with_capacity(depth);
            for instr in &block.instrs {
                total += 1;
                window.push(instr.opcode());
                if window.len() > depth {
                    window.remove(0);
                }
                for len in 1..=window.len() {
                    trie.bump(&window[window.len() - len..]);
                }
            }
        }
    }

    if total == 0 {
        return Err(Error::Analysis(AnalysisError::EmptyCodeSection));
    }

    let mut entries: Vec<FrequencyEntry> = trie
        .entries()
        .into_iter()
        .map(|(opcodes, count)| FrequencyEntry {
            opcodes,
            count,
            percent: 100.0 * count as f64 / total as f64,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(options.statistic_num.max(1));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{BasicBlock, Cfg};
    use alloc::collections::BTreeMap as Map;
    use wsa_ir::Payload;

    fn block(opcodes: &[Opcode]) -> BasicBlock {
        BasicBlock {
            instrs: opcodes.iter().map(|&o| wsa_ir::Instr::new(o, Payload::None)).collect(),
            successors: Default::default(),
        }
    }

    #[test]
    fn counts_every_depth_one_suffix_exactly_once_per_instruction() {
        let mut blocks = Map::new();
        blocks.insert(0, block(&[Opcode::LocalGet, Opcode::LocalGet, Opcode::I32Add]));
        let cfg = Cfg { blocks };
        let entries = census(&[cfg], Options { depth: 16, statistic_num: 128 }).unwrap();
        let depth_one_total: u64 = entries.iter().filter(|e| e.opcodes.len() == 1).map(|e| e.count).sum();
        assert_eq!(depth_one_total, 3);
    }

    #[test]
    fn trigram_of_add_sequence_is_counted() {
        let mut blocks = Map::new();
        blocks.insert(0, block(&[Opcode::LocalGet, Opcode::LocalGet, Opcode::I32Add]));
        let cfg = Cfg { blocks };
        let entries = census(&[cfg], Options { depth: 16, statistic_num: 128 }).unwrap();
        let trigram = entries
            .iter()
            .find(|e| e.opcodes == [Opcode::LocalGet, Opcode::LocalGet, Opcode::I32Add]);
        assert_eq!(trigram.map(|e| e.count), Some(1));
    }

    #[test]
    fn empty_code_section_is_an_error() {
        let cfg = Cfg { blocks: Map::new() };
        assert!(matches!(
            census(&[cfg], Options::default()),
            Err(Error::Analysis(AnalysisError::EmptyCodeSection))
        ));
    }
}
