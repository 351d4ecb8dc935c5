//! Packing a block map into a CARv1 byte stream (`spec.md` §4.2).

use cid::Cid;

use super::header::CarHeader;
use super::varint;
use crate::block::BlockMap;
use crate::error::CarError;

/// Serialize `blocks` into a CARv1 file rooted at `root`.
///
/// `root` need not be present in `blocks` — the header records it
/// regardless, matching CARv1's own header/body independence — but every
/// caller in this crate always includes the root block, since a CAR with a
/// dangling root is useless to a reader.
pub fn pack(blocks: &BlockMap, root: &Cid) -> Result<Vec<u8>, CarError> {
    let header = CarHeader::new(*root);
    let header_bytes = header.to_bytes()?;

    let mut out = Vec::with_capacity(header_bytes.len() + blocks.len() * 256);
    out.extend(varint::encode_u64(header_bytes.len() as u64));
    out.extend(header_bytes);

    for block in blocks.values() {
        let cid_bytes = block.cid.to_bytes();
        let frame_len = cid_bytes.len() + block.bytes.len();
        out.extend(varint::encode_u64(frame_len as u64));
        out.extend(cid_bytes);
        out.extend_from_slice(&block.bytes);
    }

    Ok(out)
}
