//! Hash-preserving backup and restore between a content-addressed,
//! append-only log database and a remote content-addressed object store.
//!
//! This crate is the engine described in `spec.md` §1: block extraction
//! from the log (`extract`), CID/address-form conversion (`cid_codec`),
//! CAR packing/unpacking (`car`), timestamped backup manifests
//! (`metadata`), remote-store upload/download with gateway fallback
//! (`remote`), listing backups in a space (`index`), and replaying a
//! backup into a fresh database instance (`restore`).
//!
//! The database engine and the remote CAS client are named external
//! collaborators (`spec.md` §6); this crate is parameterized over them
//! through the `Database`/`DbEngine` traits in [`engine`] and the
//! `RemoteStore` trait in [`remote`]. It never talks to a peer-to-peer
//! transport or owns a log engine's storage directly.

pub mod backup;
pub mod block;
pub mod car;
pub mod cid_codec;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod metadata;
pub mod progress;
pub mod remote;
pub mod restore;
pub mod retry;

pub use backup::{run_backup, BackupOptions, BackupOutcome};
pub use error::BridgeError;
pub use index::{list_backups, BackupSummary, ListBackupsOptions};
pub use progress::{BackupProgress, RestoreProgress};
pub use restore::{run_restore, RestoreOptions, RestoreOutcome};

/// Current time as milliseconds since the Unix epoch, formatted the way
/// the backup-file naming convention in `spec.md` §3 expects (`:` and `.`
/// replaced by `-`, used only for the human-facing filenames — the
/// metadata JSON's own `timestamp` field is the millisecond integer).
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_millis() as u64
}

/// RFC3339 stamp used as the metadata document's human-readable
/// `timestamp` field and as the basis for backup-file names.
pub(crate) fn now_iso8601() -> String {
    let millis = now_millis();
    let secs = (millis / 1_000) as i64;
    let nanos = ((millis % 1_000) * 1_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .expect("millis-since-epoch fits in a DateTime")
        .to_rfc3339()
}

/// Backup-file naming per `spec.md` §3: `:` and `.` in the timestamp are
/// replaced by `-` so the names are filesystem- and URL-safe.
pub fn backup_file_stem(timestamp: &str) -> String {
    timestamp.replace([':', '.'], "-")
}

pub fn metadata_file_name(timestamp: &str) -> String {
    format!("backup-{}-metadata.json", backup_file_stem(timestamp))
}

pub fn car_file_name(timestamp: &str) -> String {
    format!("backup-{}-blocks.car", backup_file_stem(timestamp))
}
