use std::path::PathBuf;

use clap::Parser;

/// Static analysis front-end for WebAssembly modules.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// The WebAssembly binary to analyze.
    #[clap(value_parser)]
    pub wasm_file: PathBuf,

    /// Run the dominator-set analysis.
    #[clap(long = "DomBuilder")]
    pub dom_builder: bool,

    /// Run the extended-basic-block partitioning.
    #[clap(long = "ExtendBasicBlockBuilder")]
    pub extend_basic_block_builder: bool,

    /// Run the high-frequency sub-expression census.
    #[clap(long = "HighFrequencySubExpr")]
    pub high_frequency_sub_expr: bool,

    /// Sliding-window depth for the sub-expression census.
    #[clap(long = "HighFrequencySubExpr.depth", default_value_t = 16)]
    pub high_frequency_sub_expr_depth: usize,

    /// Number of top n-grams the sub-expression census reports.
    #[clap(long = "HighFrequencySubExpr.num", default_value_t = 128)]
    pub high_frequency_sub_expr_num: usize,

    /// Run tree-height balancing over expression runs.
    #[clap(long = "TreeHeightBalancing")]
    pub tree_height_balancing: bool,

    /// Dump the decoded module, CFGs, and intermediate analysis state.
    #[clap(long)]
    pub debug: bool,
}
