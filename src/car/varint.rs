//! LEB128 varint framing shared by the CAR header and every block frame.
//!
//! Encoding goes through `unsigned-varint`'s buffer API; decoding is a
//! hand-rolled byte-at-a-time read because CAR frames are read off a stream
//! of unknown total length and `unsigned-varint` only decodes from a slice
//! it already has in hand.

use std::io::Read;

use crate::error::CarError;

/// Maximum bytes a u64 varint can occupy (`ceil(64 / 7)`).
const MAX_VARINT_BYTES: usize = 10;

pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut buf = unsigned_varint::encode::u64_buffer();
    unsigned_varint::encode::u64(value, &mut buf).to_vec()
}

/// Read one varint, returning `Ok(None)` only if the stream ended before any
/// byte of this varint was read — a clean end of the CAR body. Any EOF after
/// at least one byte has been consumed is a truncated frame.
pub fn read_u64_opt<R: Read>(r: &mut R) -> Result<Option<u64>, CarError> {
    let mut buf = Vec::with_capacity(MAX_VARINT_BYTES);
    loop {
        let mut byte = [0u8; 1];
        match r.read(&mut byte)? {
            0 if buf.is_empty() => return Ok(None),
            0 => return Err(CarError::Truncated),
            _ => {}
        }
        buf.push(byte[0]);
        if byte[0] & 0x80 == 0 {
            break;
        }
        if buf.len() >= MAX_VARINT_BYTES {
            return Err(CarError::Varint("varint exceeded 10 bytes".to_string()));
        }
    }
    let (value, _) = unsigned_varint::decode::u64(&buf).map_err(|e| CarError::Varint(e.to_string()))?;
    Ok(Some(value))
}

/// Read one varint, treating a clean EOF as truncation. Use this wherever a
/// varint is mandatory (the header length prefix); use `read_u64_opt` where
/// absence is a valid end-of-stream (between block frames).
pub fn read_u64<R: Read>(r: &mut R) -> Result<u64, CarError> {
    read_u64_opt(r)?.ok_or(CarError::Truncated)
}
