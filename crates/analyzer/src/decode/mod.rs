//! The wasm binary decoder: a bit-exact LEB128/section decoder producing a
//! [`Module`](crate::Module) of typed instructions and function bodies.
//!
//! Only `Type`, `Import`, `Function` and `Code` sections are inspected; the
//! rest (`Table`, `Memory`, `Global`, `Export`, `Start`, `Element`, `Data`,
//! `DataCount`, `Custom`) are skipped whole, per the module's scope — this
//! is a static analyzer, not a validator or an instantiator.

mod leb128;
mod reader;

use self::reader::Reader;
use crate::{
    error::DecodeError,
    module::{Function, Module},
};
use wsa_core::{FuncType, ValType};
use wsa_ir::{BlockType, Instr, MemArg, Opcode, Payload};

const MAGIC_AND_VERSION: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

mod section_kind {
    pub const CUSTOM: u8 = 0;
    pub const TYPE: u8 = 1;
    pub const IMPORT: u8 = 2;
    pub const FUNCTION: u8 = 3;
    pub const CODE: u8 = 10;
}

/// Decodes a complete Wasm binary module from an in-memory byte slice.
pub fn decode_module(bytes: &[u8]) -> Result<Module, DecodeError> {
    if bytes.len() < MAGIC_AND_VERSION.len() || bytes[..8] != MAGIC_AND_VERSION {
        return Err(DecodeError::BadHeader);
    }
    let mut reader = Reader::new(&bytes[8..]);

    let mut module = Module::default();
    // Index (into `module.functions`) of each function awaiting a code-section body.
    let mut pending_bodies: Vec<usize> = Vec::new();

    while !reader.is_empty() {
        let kind = reader.read_u8()?;
        let size = reader.read_u32_leb()? as usize;
        let mut body = reader.sub_reader(size)?;
        match kind {
            section_kind::CUSTOM => { /* ignored */ }
            section_kind::TYPE => decode_type_section(&mut body, &mut module)?,
            section_kind::IMPORT => decode_import_section(&mut body, &mut module)?,
            section_kind::FUNCTION => {
                decode_function_section(&mut body, &mut module, &mut pending_bodies)?
            }
            section_kind::CODE => decode_code_section(&mut body, &mut module, &pending_bodies)?,
            _ => { /* skipped without inspection */ }
        }
    }
    Ok(module)
}

fn decode_valtype(reader: &mut Reader<'_>) -> Result<ValType, DecodeError> {
    let byte = reader.read_u8()?;
    ValType::from_byte(byte).ok_or(DecodeError::InvalidValType(byte))
}

fn decode_functype(reader: &mut Reader<'_>) -> Result<FuncType, DecodeError> {
    let tag = reader.read_u8()?;
    if tag != 0x60 {
        return Err(DecodeError::InvalidFuncTypeTag(tag));
    }
    let params = decode_valtype_vec(reader)?;
    let results = decode_valtype_vec(reader)?;
    Ok(FuncType::new(params, results))
}

fn decode_valtype_vec(reader: &mut Reader<'_>) -> Result<Vec<ValType>, DecodeError> {
    let len = reader.read_vec_len()? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(decode_valtype(reader)?);
    }
    Ok(out)
}

fn decode_type_section(reader: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let len = reader.read_vec_len()?;
    for _ in 0..len {
        module.types.push(decode_functype(reader)?);
    }
    Ok(())
}

/// `(kind byte, min, max?)`: `0` = min only, `1` = min and max.
fn decode_limits(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
    let kind = reader.read_u8()?;
    match kind {
        0 => {
            reader.read_u32_leb()?;
        }
        1 => {
            reader.read_u32_leb()?;
            reader.read_u32_leb()?;
        }
        other => return Err(DecodeError::InvalidLimitsKind(other)),
    }
    Ok(())
}

fn decode_import_section(reader: &mut Reader<'_>, module: &mut Module) -> Result<(), DecodeError> {
    let len = reader.read_vec_len()?;
    for _ in 0..len {
        let _module_name = reader.read_name()?;
        let _field_name = reader.read_name()?;
        let desc_kind = reader.read_u8()?;
        match desc_kind {
            0 => {
                let type_idx = reader.read_u32_leb()?;
                let ty = module
                    .types
                    .get(type_idx as usize)
                    .cloned()
                    .ok_or(DecodeError::TypeIndexOutOfBounds(type_idx))?;
                module.functions.push(Function::imported(ty));
            }
            1 => {
                let _reftype = reader.read_u8()?;
                decode_limits(reader)?;
            }
            2 => {
                decode_limits(reader)?;
            }
            3 => {
                let _valtype = decode_valtype(reader)?;
                let _mutable = reader.read_u8()?;
            }
            other => return Err(DecodeError::InvalidImportKind(other)),
        }
    }
    Ok(())
}

fn decode_function_section(
    reader: &mut Reader<'_>,
    module: &mut Module,
    pending_bodies: &mut Vec<usize>,
) -> Result<(), DecodeError> {
    let len = reader.read_vec_len()?;
    for _ in 0..len {
        let type_idx = reader.read_u32_leb()?;
        let ty = module
            .types
            .get(type_idx as usize)
            .cloned()
            .ok_or(DecodeError::TypeIndexOutOfBounds(type_idx))?;
        pending_bodies.push(module.functions.len());
        module.functions.push(Function::defined(ty, Vec::new()));
    }
    Ok(())
}

fn decode_code_section(
    reader: &mut Reader<'_>,
    module: &mut Module,
    pending_bodies: &[usize],
) -> Result<(), DecodeError> {
    let len = reader.read_vec_len()? as usize;
    if len != pending_bodies.len() {
        return Err(DecodeError::CodeCountMismatch {
            expected: pending_bodies.len(),
            found: len,
        });
    }
    for &func_index in pending_bodies {
        let entry_size = reader.read_u32_leb()? as usize;
        let mut body = reader.sub_reader(entry_size)?;
        module.functions[func_index].instrs = decode_function_body(&mut body, &module.types)?;
    }
    Ok(())
}

fn decode_function_body(
    reader: &mut Reader<'_>,
    types: &[FuncType],
) -> Result<Vec<Instr>, DecodeError> {
    let locals_group_count = reader.read_vec_len()?;
    for _ in 0..locals_group_count {
        let count = reader.read_u32_leb()?;
        let _ty = decode_valtype(reader)?;
        let _ = count; // locals themselves are not needed by any analysis here
    }

    let mut instrs = Vec::new();
    while !reader.is_empty() {
        instrs.push(decode_instr(reader, types)?);
    }
    match instrs.last().map(Instr::opcode) {
        Some(Opcode::End) => Ok(instrs),
        _ => Err(DecodeError::MissingEnd),
    }
}

fn decode_blocktype(reader: &mut Reader<'_>, types: &[FuncType]) -> Result<BlockType, DecodeError> {
    let peek = reader.peek_u8()?;
    if peek == 0x40 {
        reader.read_u8()?;
        return Ok(BlockType::Empty);
    }
    if let Some(ty) = ValType::from_byte(peek) {
        reader.read_u8()?;
        return Ok(BlockType::Value(ty));
    }
    let idx = reader.read_i33_leb()?;
    if idx < 0 {
        return Err(DecodeError::NegativeBlockTypeIndex);
    }
    let idx = idx as u32;
    types
        .get(idx as usize)
        .cloned()
        .map(BlockType::FuncType)
        .ok_or(DecodeError::TypeIndexOutOfBounds(idx))
}

fn decode_instr(reader: &mut Reader<'_>, types: &[FuncType]) -> Result<Instr, DecodeError> {
    let first = reader.read_u8()?;
    let opcode = if first == 0xFC {
        let sub = reader.read_u32_leb()?;
        Opcode::from_fc_sub(sub).ok_or(DecodeError::UnknownOpcode)?
    } else {
        Opcode::from_byte(first).ok_or(DecodeError::UnknownOpcode)?
    };

    let payload = match opcode {
        Opcode::Block | Opcode::Loop | Opcode::If => {
            Payload::Block(decode_blocktype(reader, types)?)
        }
        Opcode::Br | Opcode::BrIf | Opcode::Call | Opcode::LocalGet | Opcode::LocalSet
        | Opcode::LocalTee | Opcode::GlobalGet | Opcode::GlobalSet => {
            Payload::Index(reader.read_u32_leb()?)
        }
        Opcode::BrTable => {
            let count = reader.read_vec_len()?;
            let mut targets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                targets.push(reader.read_u32_leb()?);
            }
            let default = reader.read_u32_leb()?;
            Payload::BrTable { targets, default }
        }
        Opcode::CallIndirect => {
            let type_idx = reader.read_u32_leb()?;
            let table_idx = reader.read_u32_leb()?;
            let ty = types
                .get(type_idx as usize)
                .cloned()
                .ok_or(DecodeError::TypeIndexOutOfBounds(type_idx))?;
            Payload::CallIndirect { ty, table: table_idx }
        }
        Opcode::MemorySize | Opcode::MemoryGrow => {
            let reserved = reader.read_u8()?;
            if reserved != 0x00 {
                return Err(DecodeError::InvalidReservedByte);
            }
            Payload::None
        }
        Opcode::I32Const => Payload::I32(reader.read_i32_leb()?),
        Opcode::I64Const => Payload::I64(reader.read_i64_leb()?),
        Opcode::F32Const => Payload::F32(reader.read_f32_bits()?),
        Opcode::F64Const => Payload::F64(reader.read_f64_bits()?),
        _ if opcode.has_mem_arg() => {
            let align = reader.read_u32_leb()?;
            let offset = reader.read_u32_leb()?;
            Payload::Mem(MemArg { align, offset })
        }
        _ => Payload::None,
    };
    Ok(Instr::new(opcode, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_empty_module() {
        let module = decode_module(&MAGIC_AND_VERSION).unwrap();
        assert!(module.types.is_empty());
        assert!(module.functions.is_empty());
    }

    #[test]
    fn rejects_bad_header() {
        let mut bytes = MAGIC_AND_VERSION;
        bytes[4] = 0x02; // corrupt version
        assert!(matches!(decode_module(&bytes), Err(DecodeError::BadHeader)));
    }

    /// `(i32, i32) -> i32` function computing `local.get 0; local.get 1; i32.add; end`.
    #[test]
    fn decodes_single_add_function() {
        let mut bytes = MAGIC_AND_VERSION.to_vec();
        // Type section: one type, (i32 i32) -> i32
        bytes.extend([1, 7, 1, 0x60, 2, 0x7F, 0x7F, 1, 0x7F]);
        // Function section: one function of type 0
        bytes.extend([3, 2, 1, 0]);
        // Code section: one body
        let body = [0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B];
        bytes.push(10);
        bytes.push((body.len() + 1) as u8);
        bytes.push(body.len() as u8);
        bytes.extend(body);

        let module = decode_module(&bytes).unwrap();
        assert_eq!(module.functions.len(), 1);
        let func = &module.functions[0];
        assert!(!func.is_import);
        assert_eq!(func.instrs.len(), 4);
        assert_eq!(func.instrs[2].opcode(), Opcode::I32Add);
        assert_eq!(func.instrs[3].opcode(), Opcode::End);
    }

    #[test]
    fn rejects_missing_end() {
        let mut bytes = MAGIC_AND_VERSION.to_vec();
        bytes.extend([1, 4, 1, 0x60, 0, 0]);
        bytes.extend([3, 2, 1, 0]);
        let body = [0x00, 0x01]; // nop, no end
        bytes.push(10);
        bytes.push((body.len() + 1) as u8);
        bytes.push(body.len() as u8);
        bytes.extend(body);
        assert!(matches!(decode_module(&bytes), Err(DecodeError::MissingEnd)));
    }

    #[test]
    fn rejects_code_count_mismatch() {
        let mut bytes = MAGIC_AND_VERSION.to_vec();
        bytes.extend([1, 4, 1, 0x60, 0, 0]);
        bytes.extend([3, 2, 1, 0]);
        bytes.extend([10, 1, 0]); // code section claims 0 entries
        assert!(matches!(
            decode_module(&bytes),
            Err(DecodeError::CodeCountMismatch { expected: 1, found: 0 })
        ));
    }
}
