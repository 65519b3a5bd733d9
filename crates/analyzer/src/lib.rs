//! `wasm-insight`'s analysis core: decodes a Wasm binary into a [`Module`],
//! reconstructs each function's control-flow graph, and runs a small set of
//! memoized analyses over it (dominators, extended basic blocks, a
//! high-frequency sub-expression census, and tree-height balancing).
//!
//! The pipeline is intentionally linear: [`decode_module`] never fails
//! partially, [`Cfg::build`](crate::cfg::Cfg::build) never guesses at
//! unsupported control flow, and [`AnalysisManager`] never re-runs an
//! analysis it has already memoized for a given [`Module`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bitset;
mod decode;
pub mod cfg;
pub mod analyses;
mod manager;
pub mod error;
mod module;

pub use crate::{
    decode::decode_module,
    error::{AnalysisError, CfgError, DecodeError, Error},
    manager::{Analysis, AnalysisManager},
    module::{Function, Module},
};
