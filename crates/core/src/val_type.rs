use core::fmt;

/// A Wasm value type, byte-tagged exactly as the binary format encodes it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// 128-bit vector (SIMD), recognized but not analyzed.
    V128,
    /// Nullable function reference.
    FuncRef,
    /// Nullable external reference.
    ExternRef,
}

impl ValType {
    /// Decodes a value-type tag byte.
    ///
    /// `FuncRef` is `0x70` per the Wasm spec. A well-known encoder in the
    /// wild emits `0x00` for it; that is a bug in that encoder, not a
    /// variant of the format, so it is not accepted here.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x7F => Self::I32,
            0x7E => Self::I64,
            0x7D => Self::F32,
            0x7C => Self::F64,
            0x7B => Self::V128,
            0x70 => Self::FuncRef,
            0x6F => Self::ExternRef,
            _ => return None,
        })
    }

    /// Encodes this value type back to its Wasm binary tag byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::I32 => 0x7F,
            Self::I64 => 0x7E,
            Self::F32 => 0x7D,
            Self::F64 => 0x7C,
            Self::V128 => 0x7B,
            Self::FuncRef => 0x70,
            Self::ExternRef => 0x6F,
        }
    }

    /// `true` for `i32`/`i64`/`f32`/`f64`.
    pub fn is_num(self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::F32 | Self::F64)
    }

    /// `true` for `funcref`/`externref`.
    pub fn is_ref(self) -> bool {
        matches!(self, Self::FuncRef | Self::ExternRef)
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::V128 => "v128",
            Self::FuncRef => "funcref",
            Self::ExternRef => "externref",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_tag() {
        for byte in [0x7F, 0x7E, 0x7D, 0x7C, 0x7B, 0x70, 0x6F] {
            let ty = ValType::from_byte(byte).unwrap();
            assert_eq!(ty.to_byte(), byte);
        }
    }

    #[test]
    fn rejects_the_historical_funcref_bug() {
        assert_eq!(ValType::from_byte(0x00), None);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(ValType::from_byte(0x01), None);
    }
}
