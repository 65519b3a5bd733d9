//! Instruction and type representation for the `wasm-insight` analyzer.
//!
//! This crate defines the single [`Opcode`] enumeration (the full Wasm MVP
//! instruction set plus sign-extension and the `0xFC`-prefixed saturating
//! truncation family) and the [`Instr`] type that pairs an opcode with its
//! decoded immediate. Nothing here decodes bytes — that is
//! [`wsa`](https://docs.rs/wsa)'s job; this crate only fixes the vocabulary
//! both the decoder and the analyses agree on.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod block_type;
mod instr;
mod mem_arg;
mod opcode;

pub use self::{
    block_type::BlockType,
    instr::{Instr, Payload},
    mem_arg::MemArg,
    opcode::Opcode,
};
