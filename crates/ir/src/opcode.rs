use core::fmt;

/// Every instruction the analyzer understands: the Wasm MVP instruction
/// set, the sign-extension proposal (`0xC0..=0xC4`) and the
/// `0xFC`-prefixed saturating truncation family.
///
/// Saturating truncation opcodes are stored as `(0xFC << 8) | sub` at
/// decode time (see [`Opcode::from_bytes`]); the enum itself just names
/// them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Opcode {
    Unreachable,
    Nop,
    Block,
    Loop,
    If,
    Else,
    End,
    Br,
    BrIf,
    BrTable,
    Return,
    Call,
    CallIndirect,

    Drop,
    Select,

    LocalGet,
    LocalSet,
    LocalTee,
    GlobalGet,
    GlobalSet,

    I32Load,
    I64Load,
    F32Load,
    F64Load,
    I32Load8S,
    I32Load8U,
    I32Load16S,
    I32Load16U,
    I64Load8S,
    I64Load8U,
    I64Load16S,
    I64Load16U,
    I64Load32S,
    I64Load32U,
    I32Store,
    I64Store,
    F32Store,
    F64Store,
    I32Store8,
    I32Store16,
    I64Store8,
    I64Store16,
    I64Store32,
    MemorySize,
    MemoryGrow,

    I32Const,
    I64Const,
    F32Const,
    F64Const,

    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,

    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,

    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,

    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,
}

impl Opcode {
    /// Looks up the plain (non-`0xFC`-prefixed) opcode for a single byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0x00 => Unreachable,
            0x01 => Nop,
            0x02 => Block,
            0x03 => Loop,
            0x04 => If,
            0x05 => Else,
            0x0B => End,
            0x0C => Br,
            0x0D => BrIf,
            0x0E => BrTable,
            0x0F => Return,
            0x10 => Call,
            0x11 => CallIndirect,

            0x1A => Drop,
            0x1B => Select,

            0x20 => LocalGet,
            0x21 => LocalSet,
            0x22 => LocalTee,
            0x23 => GlobalGet,
            0x24 => GlobalSet,

            0x28 => I32Load,
            0x29 => I64Load,
            0x2A => F32Load,
            0x2B => F64Load,
            0x2C => I32Load8S,
            0x2D => I32Load8U,
            0x2E => I32Load16S,
            0x2F => I32Load16U,
            0x30 => I64Load8S,
            0x31 => I64Load8U,
            0x32 => I64Load16S,
            0x33 => I64Load16U,
            0x34 => I64Load32S,
            0x35 => I64Load32U,
            0x36 => I32Store,
            0x37 => I64Store,
            0x38 => F32Store,
            0x39 => F64Store,
            0x3A => I32Store8,
            0x3B => I32Store16,
            0x3C => I64Store8,
            0x3D => I64Store16,
            0x3E => I64Store32,
            0x3F => MemorySize,
            0x40 => MemoryGrow,

            0x41 => I32Const,
            0x42 => I64Const,
            0x43 => F32Const,
            0x44 => F64Const,

            0x45 => I32Eqz,
            0x46 => I32Eq,
            0x47 => I32Ne,
            0x48 => I32LtS,
            0x49 => I32LtU,
            0x4A => I32GtS,
            0x4B => I32GtU,
            0x4C => I32LeS,
            0x4D => I32LeU,
            0x4E => I32GeS,
            0x4F => I32GeU,

            0x50 => I64Eqz,
            0x51 => I64Eq,
            0x52 => I64Ne,
            0x53 => I64LtS,
            0x54 => I64LtU,
            0x55 => I64GtS,
            0x56 => I64GtU,
            0x57 => I64LeS,
            0x58 => I64LeU,
            0x59 => I64GeS,
            0x5A => I64GeU,

            0x5B => F32Eq,
            0x5C => F32Ne,
            0x5D => F32Lt,
            0x5E => F32Gt,
            0x5F => F32Le,
            0x60 => F32Ge,

            0x61 => F64Eq,
            0x62 => F64Ne,
            0x63 => F64Lt,
            0x64 => F64Gt,
            0x65 => F64Le,
            0x66 => F64Ge,

            0x67 => I32Clz,
            0x68 => I32Ctz,
            0x69 => I32Popcnt,
            0x6A => I32Add,
            0x6B => I32Sub,
            0x6C => I32Mul,
            0x6D => I32DivS,
            0x6E => I32DivU,
            0x6F => I32RemS,
            0x70 => I32RemU,
            0x71 => I32And,
            0x72 => I32Or,
            0x73 => I32Xor,
            0x74 => I32Shl,
            0x75 => I32ShrS,
            0x76 => I32ShrU,
            0x77 => I32Rotl,
            0x78 => I32Rotr,

            0x79 => I64Clz,
            0x7A => I64Ctz,
            0x7B => I64Popcnt,
            0x7C => I64Add,
            0x7D => I64Sub,
            0x7E => I64Mul,
            0x7F => I64DivS,
            0x80 => I64DivU,
            0x81 => I64RemS,
            0x82 => I64RemU,
            0x83 => I64And,
            0x84 => I64Or,
            0x85 => I64Xor,
            0x86 => I64Shl,
            0x87 => I64ShrS,
            0x88 => I64ShrU,
            0x89 => I64Rotl,
            0x8A => I64Rotr,

            0x8B => F32Abs,
            0x8C => F32Neg,
            0x8D => F32Ceil,
            0x8E => F32Floor,
            0x8F => F32Trunc,
            0x90 => F32Nearest,
            0x91 => F32Sqrt,
            0x92 => F32Add,
            0x93 => F32Sub,
            0x94 => F32Mul,
            0x95 => F32Div,
            0x96 => F32Min,
            0x97 => F32Max,
            0x98 => F32Copysign,

            0x99 => F64Abs,
            0x9A => F64Neg,
            0x9B => F64Ceil,
            0x9C => F64Floor,
            0x9D => F64Trunc,
            0x9E => F64Nearest,
            0x9F => F64Sqrt,
            0xA0 => F64Add,
            0xA1 => F64Sub,
            0xA2 => F64Mul,
            0xA3 => F64Div,
            0xA4 => F64Min,
            0xA5 => F64Max,
            0xA6 => F64Copysign,

            0xA7 => I32WrapI64,
            0xA8 => I32TruncF32S,
            0xA9 => I32TruncF32U,
            0xAA => I32TruncF64S,
            0xAB => I32TruncF64U,
            0xAC => I64ExtendI32S,
            0xAD => I64ExtendI32U,
            0xAE => I64TruncF32S,
            0xAF => I64TruncF32U,
            0xB0 => I64TruncF64S,
            0xB1 => I64TruncF64U,
            0xB2 => F32ConvertI32S,
            0xB3 => F32ConvertI32U,
            0xB4 => F32ConvertI64S,
            0xB5 => F32ConvertI64U,
            0xB6 => F32DemoteF64,
            0xB7 => F64ConvertI32S,
            0xB8 => F64ConvertI32U,
            0xB9 => F64ConvertI64S,
            0xBA => F64ConvertI64U,
            0xBB => F64PromoteF32,
            0xBC => I32ReinterpretF32,
            0xBD => I64ReinterpretF64,
            0xBE => F32ReinterpretI32,
            0xBF => F64ReinterpretI64,

            0xC0 => I32Extend8S,
            0xC1 => I32Extend16S,
            0xC2 => I64Extend8S,
            0xC3 => I64Extend16S,
            0xC4 => I64Extend32S,

            _ => return None,
        })
    }

    /// Looks up a saturating-truncation opcode by its `0xFC` sub-opcode.
    pub fn from_fc_sub(sub: u32) -> Option<Self> {
        use Opcode::*;
        Some(match sub {
            0 => I32TruncSatF32S,
            1 => I32TruncSatF32U,
            2 => I32TruncSatF64S,
            3 => I32TruncSatF64U,
            4 => I64TruncSatF32S,
            5 => I64TruncSatF32U,
            6 => I64TruncSatF64S,
            7 => I64TruncSatF64U,
            _ => return None,
        })
    }

    /// Canonical Wasm text-format mnemonic, e.g. `"i32.add"`, `"local.get"`,
    /// `"memory.size"`, `"i32.trunc_sat_f32_s"`.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Unreachable => "unreachable",
            Nop => "nop",
            Block => "block",
            Loop => "loop",
            If => "if",
            Else => "else",
            End => "end",
            Br => "br",
            BrIf => "br_if",
            BrTable => "br_table",
            Return => "return",
            Call => "call",
            CallIndirect => "call_indirect",
            Drop => "drop",
            Select => "select",
            LocalGet => "local.get",
            LocalSet => "local.set",
            LocalTee => "local.tee",
            GlobalGet => "global.get",
            GlobalSet => "global.set",
            I32Load => "i32.load",
            I64Load => "i64.load",
            F32Load => "f32.load",
            F64Load => "f64.load",
            I32Load8S => "i32.load8_s",
            I32Load8U => "i32.load8_u",
            I32Load16S => "i32.load16_s",
            I32Load16U => "i32.load16_u",
            I64Load8S => "i64.load8_s",
            I64Load8U => "i64.load8_u",
            I64Load16S => "i64.load16_s",
            I64Load16U => "i64.load16_u",
            I64Load32S => "i64.load32_s",
            I64Load32U => "i64.load32_u",
            I32Store => "i32.store",
            I64Store => "i64.store",
            F32Store => "f32.store",
            F64Store => "f64.store",
            I32Store8 => "i32.store8",
            I32Store16 => "i32.store16",
            I64Store8 => "i64.store8",
            I64Store16 => "i64.store16",
            I64Store32 => "i64.store32",
            MemorySize => "memory.size",
            MemoryGrow => "memory.grow",
            I32Const => "i32.const",
            I64Const => "i64.const",
            F32Const => "f32.const",
            F64Const => "f64.const",
            I32Eqz => "i32.eqz",
            I32Eq => "i32.eq",
            I32Ne => "i32.ne",
            I32LtS => "i32.lt_s",
            I32LtU => "i32.lt_u",
            I32GtS => "i32.gt_s",
            I32GtU => "i32.gt_u",
            I32LeS => "i32.le_s",
            I32LeU => "i32.le_u",
            I32GeS => "i32.ge_s",
            I32GeU => "i32.ge_u",
            I64Eqz => "i64.eqz",
            I64Eq => "i64.eq",
            I64Ne => "i64.ne",
            I64LtS => "i64.lt_s",
            I64LtU => "i64.lt_u",
            I64GtS => "i64.gt_s",
            I64GtU => "i64.gt_u",
            I64LeS => "i64.le_s",
            I64LeU => "i64.le_u",
            I64GeS => "i64.ge_s",
            I64GeU => "i64.ge_u",
            F32Eq => "f32.eq",
            F32Ne => "f32.ne",
            F32Lt => "f32.lt",
            F32Gt => "f32.gt",
            F32Le => "f32.le",
            F32Ge => "f32.ge",
            F64Eq => "f64.eq",
            F64Ne => "f64.ne",
            F64Lt => "f64.lt",
            F64Gt => "f64.gt",
            F64Le => "f64.le",
            F64Ge => "f64.ge",
            I32Clz => "i32.clz",
            I32Ctz => "i32.ctz",
            I32Popcnt => "i32.popcnt",
            I32Add => "i32.add",
            I32Sub => "i32.sub",
            I32Mul => "i32.mul",
            I32DivS => "i32.div_s",
            I32DivU => "i32.div_u",
            I32RemS => "i32.rem_s",
            I32RemU => "i32.rem_u",
            I32And => "i32.and",
            I32Or => "i32.or",
            I32Xor => "i32.xor",
            I32Shl => "i32.shl",
            I32ShrS => "i32.shr_s",
            I32ShrU => "i32.shr_u",
            I32Rotl => "i32.rotl",
            I32Rotr => "i32.rotr",
            I64Clz => "i64.clz",
            I64Ctz => "i64.ctz",
            I64Popcnt => "i64.popcnt",
            I64Add => "i64.add",
            I64Sub => "i64.sub",
            I64Mul => "i64.mul",
            I64DivS => "i64.div_s",
            I64DivU => "i64.div_u",
            I64RemS => "i64.rem_s",
            I64RemU => "i64.rem_u",
            I64And => "i64.and",
            I64Or => "i64.or",
            I64Xor => "i64.xor",
            I64Shl => "i64.shl",
            I64ShrS => "i64.shr_s",
            I64ShrU => "i64.shr_u",
            I64Rotl => "i64.rotl",
            I64Rotr => "i64.rotr",
            F32Abs => "f32.abs",
            F32Neg => "f32.neg",
            F32Ceil => "f32.ceil",
            F32Floor => "f32.floor",
            F32Trunc => "f32.trunc",
            F32Nearest => "f32.nearest",
            F32Sqrt => "f32.sqrt",
            F32Add => "f32.add",
            F32Sub => "f32.sub",
            F32Mul => "f32.mul",
            F32Div => "f32.div",
            F32Min => "f32.min",
            F32Max => "f32.max",
            F32Copysign => "f32.copysign",
            F64Abs => "f64.abs",
            F64Neg => "f64.neg",
            F64Ceil => "f64.ceil",
            F64Floor => "f64.floor",
            F64Trunc => "f64.trunc",
            F64Nearest => "f64.nearest",
            F64Sqrt => "f64.sqrt",
            F64Add => "f64.add",
            F64Sub => "f64.sub",
            F64Mul => "f64.mul",
            F64Div => "f64.div",
            F64Min => "f64.min",
            F64Max => "f64.max",
            F64Copysign => "f64.copysign",
            I32WrapI64 => "i32.wrap_i64",
            I32TruncF32S => "i32.trunc_f32_s",
            I32TruncF32U => "i32.trunc_f32_u",
            I32TruncF64S => "i32.trunc_f64_s",
            I32TruncF64U => "i32.trunc_f64_u",
            I64ExtendI32S => "i64.extend_i32_s",
            I64ExtendI32U => "i64.extend_i32_u",
            I64TruncF32S => "i64.trunc_f32_s",
            I64TruncF32U => "i64.trunc_f32_u",
            I64TruncF64S => "i64.trunc_f64_s",
            I64TruncF64U => "i64.trunc_f64_u",
            F32ConvertI32S => "f32.convert_i32_s",
            F32ConvertI32U => "f32.convert_i32_u",
            F32ConvertI64S => "f32.convert_i64_s",
            F32ConvertI64U => "f32.convert_i64_u",
            F32DemoteF64 => "f32.demote_f64",
            F64ConvertI32S => "f64.convert_i32_s",
            F64ConvertI32U => "f64.convert_i32_u",
            F64ConvertI64S => "f64.convert_i64_s",
            F64ConvertI64U => "f64.convert_i64_u",
            F64PromoteF32 => "f64.promote_f32",
            I32ReinterpretF32 => "i32.reinterpret_f32",
            I64ReinterpretF64 => "i64.reinterpret_f64",
            F32ReinterpretI32 => "f32.reinterpret_i32",
            F64ReinterpretI64 => "f64.reinterpret_i64",
            I32Extend8S => "i32.extend8_s",
            I32Extend16S => "i32.extend16_s",
            I64Extend8S => "i64.extend8_s",
            I64Extend16S => "i64.extend16_s",
            I64Extend32S => "i64.extend32_s",
            I32TruncSatF32S => "i32.trunc_sat_f32_s",
            I32TruncSatF32U => "i32.trunc_sat_f32_u",
            I32TruncSatF64S => "i32.trunc_sat_f64_s",
            I32TruncSatF64U => "i32.trunc_sat_f64_u",
            I64TruncSatF32S => "i64.trunc_sat_f32_s",
            I64TruncSatF32U => "i64.trunc_sat_f32_u",
            I64TruncSatF64S => "i64.trunc_sat_f64_s",
            I64TruncSatF64U => "i64.trunc_sat_f64_u",
        }
    }

    /// Number of stack operands this instruction consumes.
    ///
    /// Meaningful for straight-line numeric/variable/memory instructions;
    /// control-flow opcodes (`block`, `br`, …) are not modeled here since
    /// their "operands" are structural, not stack values, and the only
    /// consumer of this count (tree-height balancing) never encounters them
    /// inside an expression-tree opcode run.
    pub fn operand_count(self) -> u32 {
        use Opcode::*;
        match self {
            // Constants and parameterless value sources.
            I32Const | I64Const | F32Const | F64Const | LocalGet | GlobalGet
            | MemorySize => 0,

            // Unary.
            I32Eqz | I64Eqz | Drop | LocalSet | LocalTee | GlobalSet | MemoryGrow
            | I32Clz | I32Ctz | I32Popcnt | I64Clz | I64Ctz | I64Popcnt
            | F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt
            | F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt
            | I32WrapI64 | I32TruncF32S | I32TruncF32U | I32TruncF64S | I32TruncF64U
            | I64ExtendI32S | I64ExtendI32U | I64TruncF32S | I64TruncF32U | I64TruncF64S
            | I64TruncF64U | F32ConvertI32S | F32ConvertI32U | F32ConvertI64S
            | F32ConvertI64U | F32DemoteF64 | F64ConvertI32S | F64ConvertI32U
            | F64ConvertI64S | F64ConvertI64U | F64PromoteF32 | I32ReinterpretF32
            | I64ReinterpretF64 | F32ReinterpretI32 | F64ReinterpretI64
            | I32Extend8S | I32Extend16S | I64Extend8S | I64Extend16S | I64Extend32S
            | I32TruncSatF32S | I32TruncSatF32U | I32TruncSatF64S | I32TruncSatF64U
            | I64TruncSatF32S | I64TruncSatF32U | I64TruncSatF64S | I64TruncSatF64U
            | I32Load | I64Load | F32Load | F64Load | I32Load8S | I32Load8U
            | I32Load16S | I32Load16U | I64Load8S | I64Load8U | I64Load16S
            | I64Load16U | I64Load32S | I64Load32U => 1,

            // Ternary (select).
            Select => 3,

            // Stores take (address, value).
            I32Store | I64Store | F32Store | F64Store | I32Store8 | I32Store16
            | I64Store8 | I64Store16 | I64Store32 => 2,

            // Everything else numeric is a binary op or comparison.
            I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU
            | I32GeS | I32GeU | I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU
            | I64LeS | I64LeU | I64GeS | I64GeU | F32Eq | F32Ne | F32Lt | F32Gt
            | F32Le | F32Ge | F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge
            | I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU
            | I32And | I32Or | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl
            | I32Rotr | I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS
            | I64RemU | I64And | I64Or | I64Xor | I64Shl | I64ShrS | I64ShrU
            | I64Rotl | I64Rotr | F32Add | F32Sub | F32Mul | F32Div | F32Min
            | F32Max | F32Copysign | F64Add | F64Sub | F64Mul | F64Div | F64Min
            | F64Max | F64Copysign => 2,

            // Control-flow / call opcodes: not modeled as stack arities here.
            _ => 0,
        }
    }

    /// Number of stack results this instruction produces. `1` for every
    /// value-producing instruction in the supported set, `0` for `drop`,
    /// stores and the void control opcodes.
    pub fn result_count(self) -> u32 {
        use Opcode::*;
        match self {
            Drop | LocalSet | GlobalSet | I32Store | I64Store | F32Store | F64Store
            | I32Store8 | I32Store16 | I64Store8 | I64Store16 | I64Store32
            | Unreachable | Nop | Block | Loop | If | Else | End | Br | BrIf
            | BrTable | Return | Call | CallIndirect => 0,
            _ => 1,
        }
    }

    /// `true` for every load/store opcode, i.e. the ones carrying a
    /// [`MemArg`](crate::MemArg) immediate.
    pub fn has_mem_arg(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            I32Load
                | I64Load
                | F32Load
                | F64Load
                | I32Load8S
                | I32Load8U
                | I32Load16S
                | I32Load16U
                | I64Load8S
                | I64Load8U
                | I64Load16S
                | I64Load16U
                | I64Load32S
                | I64Load32U
                | I32Store
                | I64Store
                | F32Store
                | F64Store
                | I32Store8
                | I32Store16
                | I64Store8
                | I64Store16
                | I64Store32
        )
    }

    /// `true` for the control-flow family the CFG reconstructor treats
    /// specially (`block`/`loop`/`if`/`else`/`end`/`br`/`br_if`/`br_table`/
    /// `return`/`unreachable`).
    pub fn is_structured_control(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Block | Loop | If | Else | End | Br | BrIf | BrTable | Return | Unreachable
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_matches_text_form() {
        assert_eq!(Opcode::I32Add.mnemonic(), "i32.add");
        assert_eq!(Opcode::LocalGet.mnemonic(), "local.get");
        assert_eq!(Opcode::MemorySize.mnemonic(), "memory.size");
        assert_eq!(
            Opcode::I32TruncSatF32S.mnemonic(),
            "i32.trunc_sat_f32_s"
        );
    }

    #[test]
    fn from_byte_round_trips_add() {
        assert_eq!(Opcode::from_byte(0x6A), Some(Opcode::I32Add));
    }

    #[test]
    fn from_fc_sub_covers_all_eight() {
        for sub in 0..8 {
            assert!(Opcode::from_fc_sub(sub).is_some());
        }
        assert_eq!(Opcode::from_fc_sub(8), None);
    }

    #[test]
    fn arities_match_stack_effects() {
        assert_eq!(Opcode::I32Add.operand_count(), 2);
        assert_eq!(Opcode::I32Add.result_count(), 1);
        assert_eq!(Opcode::I32Const.operand_count(), 0);
        assert_eq!(Opcode::I32Const.result_count(), 1);
        assert_eq!(Opcode::Drop.operand_count(), 1);
        assert_eq!(Opcode::Drop.result_count(), 0);
    }
}
