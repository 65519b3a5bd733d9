mod args;
mod report;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use wsa::analyses::{census, DomBuilder, ExtendBasicBlockBuilder, FrequencyOptions, HighFrequencySubExpr, TreeHeightBalancing};
use wsa::{decode_module, AnalysisManager};

use crate::args::Args;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let wasm_bytes = std::fs::read(&args.wasm_file)
        .with_context(|| format!("failed to read {}", args.wasm_file.display()))?;
    let module = decode_module(&wasm_bytes).map_err(|error| anyhow!("failed to decode {}: {error}", args.wasm_file.display()))?;

    if args.debug {
        report::dump_module(&module);
    }

    let manager = AnalysisManager::new(module);

    if args.debug || args.dom_builder || args.extend_basic_block_builder || args.high_frequency_sub_expr || args.tree_height_balancing {
        let cfgs = manager.get::<wsa::analyses::Cfgs>()?;
        if args.debug {
            report::dump_cfgs(&cfgs);
        }

        if args.dom_builder {
            let dom_sets = manager.get::<DomBuilder>()?;
            report::print_dominators(&dom_sets);
        }

        if args.extend_basic_block_builder {
            let ebbs = manager.get::<ExtendBasicBlockBuilder>()?;
            report::print_ebbs(&ebbs);
        }

        if args.high_frequency_sub_expr {
            let entries = if args.high_frequency_sub_expr_depth == 16 && args.high_frequency_sub_expr_num == 128 {
                manager.get::<HighFrequencySubExpr>()?.as_ref().clone()
            } else {
                census(
                    &cfgs,
                    FrequencyOptions { depth: args.high_frequency_sub_expr_depth, statistic_num: args.high_frequency_sub_expr_num },
                )
                .map_err(|error| anyhow!("{error}"))?
            };
            report::print_frequency(&entries);
        }

        if args.tree_height_balancing {
            let trees = manager.get::<TreeHeightBalancing>()?;
            report::print_tree_height(&trees, args.debug);
        }
    }

    Ok(())
}
