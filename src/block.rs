//! The `(cid, bytes)` pair that is the atomic unit of content-addressed
//! storage, and the block map type threaded through C2/C3/C4.

use std::collections::HashMap;

use bytes::Bytes;
use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::cid_codec::{self, Role};
use crate::error::CidError;

/// An immutable `(cid, bytes)` pair. Bytes are the exact serialization
/// hashed to produce `cid` — blocks are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub bytes: Bytes,
}

impl Block {
    pub fn new(cid: Cid, bytes: impl Into<Bytes>) -> Self {
        Self {
            cid,
            bytes: bytes.into(),
        }
    }
}

/// Diagnostic categorization of a block's origin, used only to populate
/// `blockSummary` in the backup metadata — see `spec.md` §3/§4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSource {
    Manifest,
    AccessController,
    Identity,
    LogEntry,
}

impl BlockSource {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockSource::Manifest => "manifest",
            BlockSource::AccessController => "access_controller",
            BlockSource::Identity => "identity",
            BlockSource::LogEntry => "log_entry",
        }
    }
}

/// A mapping `cid_string(base32) -> block`. Insertion order is irrelevant;
/// membership is the only property consumers test (`spec.md` §3).
#[derive(Debug, Clone, Default)]
pub struct BlockMap {
    inner: HashMap<String, Block>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block, keyed by its base32 CID string.
    pub fn insert(&mut self, block: Block) -> Result<(), CidError> {
        let key = cid_codec::stringify_for(&block.cid, Role::Remote)?;
        self.inner.insert(key, block);
        Ok(())
    }

    pub fn get(&self, cid: &Cid) -> Option<&Block> {
        let key = cid_codec::stringify_for(cid, Role::Remote).ok()?;
        self.inner.get(&key)
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.get(cid).is_some()
    }

    pub fn contains_key_str(&self, base32_key: &str) -> bool {
        self.inner.contains_key(base32_key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Block> {
        self.inner.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    pub fn into_values(self) -> impl Iterator<Item = Block> {
        self.inner.into_values()
    }
}
