//! CID parsing and address-form conversion (C1).
//!
//! The remote store and the log engine key their storage by two different
//! string encodings of the same multihash. This module is the sole place
//! that decides which base a given role uses — see `spec.md` §4.1.

use cid::Cid;
use multibase::Base;
use multihash::Multihash;
use sha2::{Digest, Sha256};

use crate::error::CidError;

/// The sha2-256 multicodec code, per the multihash table.
const SHA2_256: u64 = 0x12;

/// `dag-cbor` — manifests, access controllers, identities, log entries.
pub const CODEC_DAG_CBOR: u64 = 0x71;
/// `raw` — opaque payload blocks, and the form the remote store hands back
/// as a root CID.
pub const CODEC_RAW: u64 = 0x55;

/// Which storage role a CID's string form is being produced for.
///
/// Remote-store operations use base32 (the remote store's canonical form);
/// log-storage keys use base58btc (the log engine's canonical form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Remote,
    LogStorage,
}

/// Parse a CID string in either base32 or base58btc form.
pub fn parse(s: &str) -> Result<Cid, CidError> {
    Cid::try_from(s).map_err(|_| CidError::InvalidCid(s.to_string()))
}

/// Re-encode a CID as base32 (`b...`), the remote store's canonical form.
pub fn to_base32(cid: &Cid) -> Result<String, CidError> {
    cid.to_string_of_base(Base::Base32Lower)
        .map_err(|_| CidError::InvalidCid(cid.to_string()))
}

/// Re-encode a CID as base58btc (`z...`), the log storage's canonical form.
pub fn to_base58btc(cid: &Cid) -> Result<String, CidError> {
    cid.to_string_of_base(Base::Base58Btc)
        .map_err(|_| CidError::InvalidCid(cid.to_string()))
}

/// Produce a new CID with the same multihash but a different codec marker.
///
/// Used to map a dag-cbor log entry's CID to the `raw` form the remote
/// store exposes for its root, and vice versa. The multihash bytes are
/// never touched — only the codec byte changes.
pub fn re_codec(cid: &Cid, new_codec: u64) -> Cid {
    Cid::new_v1(new_codec, *cid.hash())
}

/// The canonical string form of a CID for a given storage role.
///
/// This is the sole place where the choice of base is made; every caller
/// that needs a string key for the remote store or the log storage must
/// go through this function instead of calling `to_string()` directly.
pub fn stringify_for(cid: &Cid, role: Role) -> Result<String, CidError> {
    match role {
        Role::Remote => to_base32(cid),
        Role::LogStorage => to_base58btc(cid),
    }
}

/// Derive a CIDv1 for `bytes` under `codec`, hashing with sha2-256 — the
/// hash function every block this crate produces (log entries, manifests,
/// access controllers, identities, and raw payloads) uses.
pub fn compute_cid(bytes: &[u8], codec: u64) -> Cid {
    let digest = Sha256::digest(bytes);
    let hash = Multihash::wrap(SHA2_256, &digest).expect("sha2-256 digest fits a multihash");
    Cid::new_v1(codec, hash)
}
