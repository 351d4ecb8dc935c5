//! Unpacking a CARv1 byte stream back into a block map (`spec.md` §4.2).

use std::io::{Cursor, Read};

use cid::Cid;
use tracing::trace;

use super::hash;
use super::header::CarHeader;
use super::varint;
use crate::block::{Block, BlockMap};
use crate::error::CarError;

pub struct UnpackedCar {
    pub header: CarHeader,
    pub blocks: BlockMap,
}

pub fn unpack(bytes: &[u8]) -> Result<UnpackedCar, CarError> {
    unpack_stream(Cursor::new(bytes))
}

/// Read a CARv1 file from any `Read` source, one frame at a time, so a
/// caller streaming a large backup off disk or a network socket never has
/// to hold the whole file in memory at once (`spec.md` §4.2: "Input: a byte
/// buffer or a streaming byte source").
pub fn unpack_stream<R: Read>(mut r: R) -> Result<UnpackedCar, CarError> {
    let header_len = varint::read_u64(&mut r)?;
    let mut header_buf = vec![0u8; header_len as usize];
    r.read_exact(&mut header_buf)?;
    let header = CarHeader::from_bytes(&header_buf)?;

    let mut blocks = BlockMap::new();
    while let Some(frame_len) = varint::read_u64_opt(&mut r)? {
        let mut frame = vec![0u8; frame_len as usize];
        r.read_exact(&mut frame).map_err(|_| CarError::Truncated)?;

        let mut frame_cursor = Cursor::new(&frame);
        let cid = Cid::read_bytes(&mut frame_cursor)
            .map_err(|e| CarError::HeaderInvalid(format!("malformed block CID: {e}")))?;
        let cid_len = frame_cursor.position() as usize;
        let content = &frame[cid_len..];

        hash::verify(&cid, content)?;
        trace!(cid = %cid, bytes = content.len(), "unpacked CAR block");
        blocks.insert(Block::new(cid, content.to_vec()))?;
    }

    Ok(UnpackedCar { header, blocks })
}
