//! Packet serialization to and from a bit stream.
//!
//! The wire layout is a 16-bit big-endian payload length header (in bytes)
//! followed by the payload bits, both MSB first. The explicit header lets
//! the deserializer recover the payload boundary after FEC decoding pads
//! or truncates the stream.

use super::CodecError;

/// Number of header bits preceding the payload.
pub const HEADER_BITS: usize = 16;

/// Serialize a payload into bits. Fails when the payload length does not
/// fit the 16-bit header.
pub fn serialize(payload: &[u8]) -> Result<Vec<bool>, CodecError> {
    if payload.len() > u16::MAX as usize {
        return Err(CodecError::PayloadTooLarge { bytes: payload.len() });
    }
    let mut bits = Vec::with_capacity(HEADER_BITS + payload.len() * 8);
    push_byte_bits(&mut bits, (payload.len() >> 8) as u8);
    push_byte_bits(&mut bits, payload.len() as u8);
    for &byte in payload {
        push_byte_bits(&mut bits, byte);
    }
    Ok(bits)
}

/// Recover the payload from a bit stream produced by [`serialize`].
///
/// The stream may carry trailing padding bits; anything beyond the length
/// declared in the header is ignored. A header that promises more bits
/// than are present is a truncated frame.
pub fn deserialize(bits: &[bool]) -> Result<Vec<u8>, CodecError> {
    if bits.len() < HEADER_BITS {
        return Err(CodecError::TruncatedFrame { expected: HEADER_BITS, actual: bits.len() });
    }
    let length = (read_byte(&bits[0..8]) as usize) << 8 | read_byte(&bits[8..16]) as usize;
    let needed = HEADER_BITS + length * 8;
    if bits.len() < needed {
        return Err(CodecError::TruncatedFrame { expected: needed, actual: bits.len() });
    }
    Ok(bits[HEADER_BITS..needed].chunks_exact(8).map(read_byte).collect())
}

fn push_byte_bits(bits: &mut Vec<bool>, byte: u8) {
    for shift in (0..8).rev() {
        bits.push(byte >> shift & 1 == 1);
    }
}

fn read_byte(bits: &[bool]) -> u8 {
    bits.iter().fold(0, |byte, &bit| byte << 1 | bit as u8)
}
