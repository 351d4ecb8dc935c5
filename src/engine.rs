//! The external collaborator contracts this crate is parameterized over.
//!
//! `spec.md` §6 names these as components this crate talks to but never
//! owns: the append-only log database (OrbitDB-like) and the block/log
//! storage layers underneath it. Every type here is a trait; the engine
//! embedding this crate provides the concrete implementation, and this
//! crate's extractor (C3) and restorer (C7) are generic over them.

use std::collections::HashMap;

use async_trait::async_trait;
use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// A single entry in the append-only log, as `spec.md` §3 defines it:
/// `{v, id, key, sig, next[], refs[], clock, payload, identity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub v: u64,
    pub id: String,
    pub key: String,
    pub sig: String,
    pub next: Vec<Cid>,
    pub refs: Vec<Cid>,
    pub clock: LogicalClock,
    pub payload: serde_json::Value,
    pub identity: Cid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalClock {
    pub id: String,
    pub time: u64,
}

/// A key-addressed block store, as the log engine exposes it internally.
/// Both the OrbitDB-like engine's own on-disk store and the restored copy
/// this crate writes during C7 implement this.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, BridgeError>;
    async fn put(&self, cid: &Cid, bytes: &[u8]) -> Result<(), BridgeError>;
    async fn has(&self, cid: &Cid) -> Result<bool, BridgeError> {
        Ok(self.get(cid).await?.is_some())
    }
}

/// The append-only log storage layer. Keyed by the CID's base58btc string
/// form, as `spec.md` §6 names it directly: `DB.log.storage.put(cidString_
/// base58btc, bytes)`. This stores raw block bytes, not a decoded
/// `LogEntry` — restore installs every extracted block here (manifest,
/// access controller, identities, log entries alike), not only entries
/// (`spec.md` §4.7 step 6).
#[async_trait]
pub trait LogStorage: Send + Sync {
    async fn get(&self, base58btc_key: &str) -> Result<Option<Vec<u8>>, BridgeError>;
    async fn put(&self, base58btc_key: &str, bytes: &[u8]) -> Result<(), BridgeError>;

    /// The log's current head set, as the engine itself understands it —
    /// populated by `Database::join_entry`, not computed by this crate.
    async fn heads(&self) -> Result<Vec<Cid>, BridgeError>;
}

/// A single open OrbitDB-like database instance.
#[async_trait]
pub trait Database: Send + Sync {
    /// The database's logical address, e.g. `/orbitdb/<manifest-cid>/<name>`.
    fn address(&self) -> &str;

    /// Every entry currently reachable from the heads, in engine-defined
    /// order. C3 treats this as the authoritative enumeration of the log.
    async fn all(&self) -> Result<Vec<(Cid, LogEntry)>, BridgeError>;

    fn blockstore(&self) -> &dyn BlockStore;

    fn log_storage(&self) -> &dyn LogStorage;

    /// Manifest block CID this database was opened from.
    fn manifest_cid(&self) -> Cid;

    /// Join an externally-sourced entry into the log, as the last step of
    /// restore head rediscovery (`spec.md` §4.7 step 8).
    async fn join_entry(&self, entry: &LogEntry) -> Result<(), BridgeError>;

    async fn close(&self) -> Result<(), BridgeError>;
}

/// The factory surface restore needs: open a database fresh, or reopen one
/// that was just populated with restored blocks, without this crate
/// knowing anything about the engine's connection bootstrapping.
#[async_trait]
pub trait DbEngine: Send + Sync {
    async fn open(&self, address: &str) -> Result<Box<dyn Database>, BridgeError>;

    /// Count of log entries currently materialized for `address`, used by
    /// restore's poll-with-stabilization loop (`spec.md` §4.7 step 10).
    async fn entry_count(&self, address: &str) -> Result<u64, BridgeError>;

    /// The engine's shared block store, reachable before any database is
    /// open — restore must install the manifest block here first, since
    /// opening the address requires reading it (`spec.md` §4.7 step 5).
    fn blockstore(&self) -> &dyn BlockStore;

    /// The engine's shared log storage, reachable before any database is
    /// open — restore installs every log-entry block here too, keyed by
    /// base58btc, so log hydration can find them once the database opens
    /// (`spec.md` §4.7 step 6).
    fn log_storage(&self) -> &dyn LogStorage;
}

pub type BlockSummaryCounts = HashMap<String, u64>;
