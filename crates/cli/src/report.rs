use wsa::analyses::{DomSets, ExtendedBasicBlock, FrequencyEntry, Tree};
use wsa::cfg::Cfg;
use wsa::Module;

/// Dumps the decoded module: every function's signature and instruction
/// list, one line per instruction. Enabled by `--debug`.
pub fn dump_module(module: &Module) {
    println!("Module");
    for (index, function) in module.functions.iter().enumerate() {
        let kind = if function.is_import { "import" } else { "defined" };
        println!("  Function #{index} ({kind}) {:?} -> {:?}", function.ty.params(), function.ty.results());
        for instr in &function.instrs {
            println!("    {instr}");
        }
    }
}

/// Dumps every function's simplified CFG: block ids, their instructions,
/// and successor edges. Enabled by `--debug`.
pub fn dump_cfgs(cfgs: &[Cfg]) {
    for (func_index, cfg) in cfgs.iter().enumerate() {
        println!("Cfg for function #{func_index}");
        for (&id, block) in &cfg.blocks {
            let successors: Vec<String> = block.successors.iter().map(|s| s.to_string()).collect();
            println!("  block {id} -> [{}]", successors.join(", "));
            for instr in &block.instrs {
                println!("    {instr}");
            }
        }
    }
}

pub fn print_dominators(dom_sets: &[DomSets]) {
    for (func_index, dom) in dom_sets.iter().enumerate() {
        println!("Dominators for function #{func_index}");
        for (&id, set) in dom {
            let doms: Vec<String> = set.iter_ones().map(|b| b.to_string()).collect();
            println!("  block {id}: {{{}}}", doms.join(", "));
        }
    }
}

pub fn print_ebbs(ebbs: &[Vec<ExtendedBasicBlock>]) {
    for (func_index, func_ebbs) in ebbs.iter().enumerate() {
        println!("Extended basic blocks for function #{func_index}");
        for ebb in func_ebbs {
            let members: Vec<String> = ebb.members.iter().map(|m| m.to_string()).collect();
            println!("  entry {}: {{{}}}", ebb.entry, members.join(", "));
        }
    }
}

/// Stable output format: one line per ranked n-gram, `<op1>, <op2>, …:
/// <percent>%`.
pub fn print_frequency(entries: &[FrequencyEntry]) {
    for entry in entries {
        let opcodes: Vec<String> = entry.opcodes.iter().map(|o| o.to_string()).collect();
        println!("{}: {:.4}%", opcodes.join(", "), entry.percent);
    }
}

pub fn print_tree_height(trees: &[Tree], debug: bool) {
    println!("Balanced {} expression tree(s)", trees.len());
    if !debug {
        return;
    }
    for (index, tree) in trees.iter().enumerate() {
        println!("  tree #{index}: {} node(s), height {}", tree.len(), tree.height());
        dump_tree_node(tree, tree.root(), 2);
    }
}

fn dump_tree_node(tree: &Tree, index: usize, indent: usize) {
    let node = tree.node(index);
    println!("{:indent$}{} (rank {})", "", node.instr, node.rank, indent = indent);
    if let Some(left) = node.left {
        dump_tree_node(tree, left, indent + 2);
    }
    if let Some(right) = node.right {
        dump_tree_node(tree, right, indent + 2);
    }
}
