//! Rehashing block content against the multihash declared in its CID.
//!
//! `spec.md` §4.2 requires the unpacker to verify every block it reads, not
//! merely trust the frame's CID. We support the two hash functions this
//! crate's own writer ever produces (sha2-256, the IPFS/OrbitDB convention,
//! and blake3 for in-process fixtures); any other multihash code fails
//! verification rather than being silently accepted.

use cid::Cid;
use sha2::{Digest, Sha256};

use crate::error::CarError;

const SHA2_256_CODE: u64 = 0x12;
const BLAKE3_CODE: u64 = 0x1e;

pub fn verify(cid: &Cid, content: &[u8]) -> Result<(), CarError> {
    let digest_matches = match cid.hash().code() {
        SHA2_256_CODE => Sha256::digest(content).as_slice() == cid.hash().digest(),
        BLAKE3_CODE => blake3::hash(content).as_bytes() == cid.hash().digest(),
        _ => false,
    };
    if digest_matches {
        Ok(())
    } else {
        Err(CarError::CorruptBlock {
            cid: cid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid_codec::CODEC_RAW;
    use multihash::Multihash;

    #[test]
    fn sha2_256_round_trips() {
        let content = b"block content";
        let digest = Sha256::digest(content);
        let hash = Multihash::wrap(SHA2_256_CODE, &digest).unwrap();
        let cid = Cid::new_v1(CODEC_RAW, hash);
        assert!(verify(&cid, content).is_ok());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let digest = Sha256::digest(b"original");
        let hash = Multihash::wrap(SHA2_256_CODE, &digest).unwrap();
        let cid = Cid::new_v1(CODEC_RAW, hash);
        assert!(verify(&cid, b"tampered").is_err());
    }

    #[test]
    fn unknown_hash_function_fails_closed() {
        let hash = Multihash::wrap(0x99, &[1, 2, 3]).unwrap();
        let cid = Cid::new_v1(CODEC_RAW, hash);
        assert!(verify(&cid, b"anything").is_err());
    }
}
