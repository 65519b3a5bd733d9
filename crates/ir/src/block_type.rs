use wsa_core::{FuncType, ValType};

/// The type carried by `block`, `loop` and `if`.
///
/// Encodes to one of three binary shapes: `0x40` (empty), a single
/// value-type byte (one result, no params), or a signed-33 LEB index into
/// the module's type table.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockType {
    /// `[] -> []`.
    Empty,
    /// `[] -> [t]`.
    Value(ValType),
    /// An arbitrary `params -> results` signature, shared with the module's
    /// type table.
    FuncType(FuncType),
}

impl BlockType {
    /// The type as seen by a consumer: always a [`FuncType`], synthesizing
    /// one for the `Empty`/`Value` shorthands.
    pub fn func_type(&self) -> FuncType {
        match self {
            Self::Empty => FuncType::new([], []),
            Self::Value(ty) => FuncType::new([], [*ty]),
            Self::FuncType(ty) => ty.clone(),
        }
    }
}
