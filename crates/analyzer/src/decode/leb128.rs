//! Bit-exact LEB128 decoding.
//!
//! Both flavors share one invariant-checking strategy: decode into a 64-bit
//! accumulator using the full byte budget the target width allows
//! (`ceil(bits / 7)` bytes), then check that the accumulated value actually
//! fits in `bits` bits (sign-extended, for the signed flavor). That one
//! check subsumes the usual byte-by-byte "does the last byte set spare high
//! bits" reasoning and rejects both overlong encodings and encodings that
//! overflow the target.

use crate::error::DecodeError;

/// Reads an unsigned LEB128 integer with a target width of `bits` bits
/// (`bits <= 64`).
pub fn read_uleb(data: &[u8], pos: &mut usize, bits: u32) -> Result<u64, DecodeError> {
    debug_assert!(bits <= 64);
    let max_bytes = bits.div_ceil(7);
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut byte_count: u32 = 0;
    loop {
        if byte_count >= max_bytes {
            return Err(DecodeError::Overlong);
        }
        let byte = read_byte(data, pos)?;
        byte_count += 1;
        let low7 = u64::from(byte & 0x7F);
        if shift < 64 {
            result |= low7 << shift;
        }
        let more = byte & 0x80 != 0;
        shift += 7;
        if !more {
            if bits < 64 && (result >> bits) != 0 {
                return Err(DecodeError::Overflow);
            }
            return Ok(result);
        }
    }
}

/// Reads a signed LEB128 integer with a target width of `bits` bits
/// (`bits <= 64`), e.g. `bits = 33` for the block-type index encoding.
pub fn read_sleb(data: &[u8], pos: &mut usize, bits: u32) -> Result<i64, DecodeError> {
    debug_assert!(bits <= 64);
    let max_bytes = bits.div_ceil(7);
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut byte_count: u32 = 0;
    loop {
        if byte_count >= max_bytes {
            return Err(DecodeError::Overlong);
        }
        let byte = read_byte(data, pos)?;
        byte_count += 1;
        let low7 = i64::from(byte & 0x7F);
        if shift < 64 {
            result |= low7 << shift;
        }
        let more = byte & 0x80 != 0;
        let sign_bit_set = byte & 0x40 != 0;
        shift += 7;
        if !more {
            if shift < 64 && sign_bit_set {
                result |= -(1i64 << shift);
            }
            let valid = if bits >= 64 {
                true
            } else {
                let shift_out = 64 - bits;
                (result << shift_out) >> shift_out == result
            };
            if !valid {
                return Err(DecodeError::Overflow);
            }
            return Ok(result);
        }
    }
}

fn read_byte(data: &[u8], pos: &mut usize) -> Result<u8, DecodeError> {
    let byte = *data.get(*pos).ok_or(DecodeError::UnexpectedEof)?;
    *pos += 1;
    Ok(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uleb(bytes: &[u8], bits: u32) -> Result<u64, DecodeError> {
        let mut pos = 0;
        read_uleb(bytes, &mut pos, bits)
    }

    fn sleb(bytes: &[u8], bits: u32) -> Result<i64, DecodeError> {
        let mut pos = 0;
        read_sleb(bytes, &mut pos, bits)
    }

    #[test]
    fn decodes_small_unsigned_values() {
        assert_eq!(uleb(&[0x00], 32).unwrap(), 0);
        assert_eq!(uleb(&[0x7F], 32).unwrap(), 127);
        assert_eq!(uleb(&[0xE5, 0x8E, 0x26], 32).unwrap(), 624485);
    }

    #[test]
    fn decodes_max_u32() {
        assert_eq!(uleb(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], 32).unwrap(), u32::MAX as u64);
    }

    #[test]
    fn rejects_u32_overflow() {
        // Fifth byte sets a bit above bit 31.
        assert!(matches!(uleb(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F], 32), Err(DecodeError::Overflow)));
    }

    #[test]
    fn rejects_overlong_u32() {
        assert!(matches!(
            uleb(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00], 32),
            Err(DecodeError::Overlong)
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(uleb(&[0x80], 32), Err(DecodeError::UnexpectedEof)));
    }

    #[test]
    fn decodes_signed_values_with_sign_extension() {
        assert_eq!(sleb(&[0x7F], 32).unwrap(), -1);
        assert_eq!(sleb(&[0x00], 32).unwrap(), 0);
        assert_eq!(sleb(&[0x9B, 0xF1, 0x59], 32).unwrap(), -624485);
    }

    #[test]
    fn round_trips_every_i32() {
        for x in [0i32, 1, -1, i32::MIN, i32::MAX, 42, -42] {
            let encoded = encode_sleb(x as i64);
            assert_eq!(sleb(&encoded, 32).unwrap(), x as i64);
        }
    }

    fn encode_sleb(mut value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
            if done {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
        out
    }
}
