use core::fmt;
#[cfg(feature = "std")]
use std::error::Error as StdError;

/// Errors that can occur while decoding a Wasm binary into a [`Module`](crate::Module).
///
/// No partial module is ever returned alongside one of these: decoding is
/// all-or-nothing.
#[derive(Debug)]
pub enum DecodeError {
    /// The first eight bytes were not `00 61 73 6D 01 00 00 00`.
    BadHeader,
    /// The byte stream ended before a length-prefixed field was satisfied.
    UnexpectedEof,
    /// A LEB128 integer used more bytes than `ceil(bits / 7)` allows.
    Overlong,
    /// A LEB128 integer set bits above its target width.
    Overflow,
    /// A value-type tag byte was not one of the seven recognized bytes.
    InvalidValType(u8),
    /// A function type did not start with `0x60`.
    InvalidFuncTypeTag(u8),
    /// An import description kind byte was not `0..=3`.
    InvalidImportKind(u8),
    /// A limits kind byte was not `0` or `1`.
    InvalidLimitsKind(u8),
    /// `memory.size`/`memory.grow`'s reserved byte was not `0x00`.
    InvalidReservedByte,
    /// A negative index was decoded where a block-type index (non-negative
    /// signed-33 LEB) was expected.
    NegativeBlockTypeIndex,
    /// A code-section entry's instruction stream did not end with `end`.
    MissingEnd,
    /// The code section did not have exactly one entry per non-imported
    /// function.
    CodeCountMismatch { expected: usize, found: usize },
    /// An opcode byte (or `0xFC` sub-opcode) this decoder does not model.
    UnknownOpcode,
    /// A `block`/`loop`/`if` (or `call_indirect`) type index pointed past
    /// the end of the type table.
    TypeIndexOutOfBounds(u32),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHeader => write!(f, "not a Wasm binary: bad magic number or version"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::Overlong => write!(f, "overlong LEB128 encoding"),
            Self::Overflow => write!(f, "LEB128 value overflows its target width"),
            Self::InvalidValType(b) => write!(f, "invalid value type byte 0x{b:02X}"),
            Self::InvalidFuncTypeTag(b) => write!(f, "invalid function type tag 0x{b:02X}, expected 0x60"),
            Self::InvalidImportKind(b) => write!(f, "invalid import description kind 0x{b:02X}"),
            Self::InvalidLimitsKind(b) => write!(f, "invalid limits kind 0x{b:02X}"),
            Self::InvalidReservedByte => write!(f, "expected reserved byte 0x00"),
            Self::NegativeBlockTypeIndex => write!(f, "block type index must not be negative"),
            Self::MissingEnd => write!(f, "function body did not end with `end`"),
            Self::CodeCountMismatch { expected, found } => write!(
                f,
                "code section has {found} entries, expected {expected} (one per non-imported function)"
            ),
            Self::UnknownOpcode => write!(f, "unknown instruction"),
            Self::TypeIndexOutOfBounds(idx) => write!(f, "type index {idx} out of bounds"),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for DecodeError {}

/// Errors surfaced by the CFG reconstructor.
#[derive(Debug)]
pub enum CfgError {
    /// `br_table` was encountered; the CFG reconstructor refuses to guess
    /// at its fan-out and fails explicitly rather than mis-model it.
    BrTableUnsupported,
    /// The structured-block frame stack was non-empty at the end of the
    /// function (or a frame kind mismatch was found, e.g. `else` outside
    /// an `if`).
    UnbalancedFrames,
}

impl fmt::Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrTableUnsupported => {
                write!(f, "todo: br_table is not supported by the CFG reconstructor")
            }
            Self::UnbalancedFrames => {
                write!(f, "malformed function: structured control frame stack not empty at `end`")
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for CfgError {}

/// Errors surfaced by an analysis once it has a CFG to work with.
#[derive(Debug)]
pub enum AnalysisError {
    /// An analysis that requires at least one basic block found none.
    NoBasicBlocks,
    /// [`HighFrequencySubExpr`](crate::analyses::HighFrequencySubExpr) ran
    /// over a module with zero instructions.
    EmptyCodeSection,
    /// Tree-height balancing reached a leaf opcode outside
    /// `{i32.const, local.get, global.get}`, which has no defined rank.
    UnrankedLeaf(wsa_ir::Opcode),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBasicBlocks => write!(f, "analysis requires at least one basic block"),
            Self::EmptyCodeSection => write!(f, "empty code section"),
            Self::UnrankedLeaf(op) => write!(f, "leaf opcode `{op}` has no defined rank"),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for AnalysisError {}

/// The top-level error returned by the analyzer pipeline.
#[derive(Debug)]
pub enum Error {
    Decode(DecodeError),
    Cfg(CfgError),
    Analysis(AnalysisError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => fmt::Display::fmt(e, f),
            Self::Cfg(e) => fmt::Display::fmt(e, f),
            Self::Analysis(e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            Self::Cfg(e) => Some(e),
            Self::Analysis(e) => Some(e),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<CfgError> for Error {
    fn from(e: CfgError) -> Self {
        Self::Cfg(e)
    }
}

impl From<AnalysisError> for Error {
    fn from(e: AnalysisError) -> Self {
        Self::Analysis(e)
    }
}
