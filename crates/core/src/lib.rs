//! Core value types shared by the `wasm-insight` analyzer crates.
//!
//! This crate mirrors the small, dependency-free "primitives" layer that a
//! Wasm front-end typically factors out of its main crate: value types and
//! function signatures, plus the bit patterns the binary format uses to
//! encode them. Everything here is inert data — no decoding, no control
//! flow, no analysis.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod func_type;
mod val_type;

pub use self::{func_type::FuncType, val_type::ValType};
