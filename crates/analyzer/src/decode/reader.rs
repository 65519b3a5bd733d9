use alloc::string::String;

use super::leb128::{read_sleb, read_uleb};
use crate::error::DecodeError;

/// A cursor over a byte slice with the primitive reads the section/code
/// decoders are built from.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.data.get(self.pos).copied().ok_or(DecodeError::UnexpectedEof)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Splits off a sub-reader over the next `len` bytes, advancing past
    /// them in `self`.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, DecodeError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    pub fn read_u32_leb(&mut self) -> Result<u32, DecodeError> {
        Ok(read_uleb(self.data, &mut self.pos, 32)? as u32)
    }

    pub fn read_u64_leb(&mut self) -> Result<u64, DecodeError> {
        read_uleb(self.data, &mut self.pos, 64)
    }

    pub fn read_i32_leb(&mut self) -> Result<i32, DecodeError> {
        Ok(read_sleb(self.data, &mut self.pos, 32)? as i32)
    }

    pub fn read_i64_leb(&mut self) -> Result<i64, DecodeError> {
        read_sleb(self.data, &mut self.pos, 64)
    }

    /// The signed-33 LEB used to encode `block`/`loop`/`if` type indices.
    pub fn read_i33_leb(&mut self) -> Result<i64, DecodeError> {
        read_sleb(self.data, &mut self.pos, 33)
    }

    pub fn read_f32_bits(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f64_bits(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// A length-prefixed name, taken as-is with no UTF-8 validation: bytes
    /// that aren't valid UTF-8 are replaced with U+FFFD rather than
    /// failing the decode.
    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32_leb()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_vec_len(&mut self) -> Result<u32, DecodeError> {
        self.read_u32_leb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_name_accepts_invalid_utf8_instead_of_failing() {
        let bytes = [3, 0xFF, 0xFE, b'a'];
        let mut reader = Reader::new(&bytes);
        let name = reader.read_name().unwrap();
        assert!(name.ends_with('a'));
        assert!(name.contains('\u{FFFD}'));
    }
}
