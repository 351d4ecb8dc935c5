//! The backup orchestrator (C5): extract, pack, upload, describe
//! (`spec.md` §4.5).

use std::collections::HashMap;

use cid::Cid;
use tracing::info;

use crate::block::BlockSource;
use crate::car;
use crate::cid_codec;
use crate::engine::Database;
use crate::error::BridgeError;
use crate::extract::{self, ExtractedBlocks};
use crate::metadata::{BackupMetadata, DatabaseSummary};
use crate::progress::BackupProgress;
use crate::remote::RemoteStore;
use crate::retry::{self, RetryConfig};

pub struct BackupOptions {
    /// Logical label partitioning backups sharing one remote-store
    /// account (`spec.md` §3, default `"default"`).
    pub space_name: String,
    pub retry: RetryConfig,
    pub progress: Option<Box<dyn FnMut(BackupProgress) + Send>>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            space_name: "default".to_string(),
            retry: RetryConfig::default(),
            progress: None,
        }
    }
}

impl BackupOptions {
    fn emit(&mut self, event: BackupProgress) {
        if let Some(cb) = self.progress.as_mut() {
            cb(event);
        }
    }
}

/// The result of one backup, mirroring the return shape of `spec.md`
/// §4.5: manifest/CAR/metadata CIDs, the database this backup covers, and
/// the two uploaded files' sizes and CIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub manifest_cid: Cid,
    pub database_address: String,
    pub database_name: String,
    pub blocks_total: u64,
    pub car_file_size: u64,
    pub entry_count: u64,
    pub timestamp: u64,
    pub metadata_cid: Cid,
    pub car_cid: Cid,
    pub metadata_file_name: String,
    pub car_file_name: String,
}

/// Run one backup of `db` into `space_name` on `remote`, per the 9-step
/// sequence in `spec.md` §4.5. The database is left open; closing it is
/// the caller's responsibility.
pub async fn run_backup(
    db: &dyn Database,
    remote: &dyn RemoteStore,
    mut opts: BackupOptions,
) -> Result<BackupOutcome, BridgeError> {
    let address = db.address().to_string();
    opts.emit(BackupProgress::OpeningDatabase {
        address: address.clone(),
    });

    opts.emit(BackupProgress::ExtractingBlocks {
        address: address.clone(),
    });
    let ExtractedBlocks {
        blocks,
        sources,
        manifest_cid,
        database_name,
        database_type,
    } = extract::extract(db).await?;
    let entries = db.all().await?;
    let entry_count = entries.len() as u64;
    opts.emit(BackupProgress::BlocksExtracted {
        address: address.clone(),
        block_count: blocks.len() as u64,
    });

    opts.emit(BackupProgress::PackingCar {
        block_count: blocks.len() as u64,
    });
    let car_bytes = car::pack(&blocks, &manifest_cid)?;
    let car_file_size = car_bytes.len() as u64;

    // Upload the CAR first so the metadata — consulted first at restore —
    // can embed its CID (`spec.md` §4.5 step 5).
    opts.emit(BackupProgress::Uploading {
        byte_count: car_file_size,
    });
    let space = opts.space_name.clone();
    let car_cid = retry::with_retry(
        &opts.retry,
        |err| err.retryable(),
        || async { Ok(remote.upload(&space, car_bytes.clone()).await?) },
    )
    .await?;
    opts.emit(BackupProgress::Uploaded {
        car_cid: car_cid.to_string(),
    });

    opts.emit(BackupProgress::WritingMetadata);
    let timestamp = crate::now_millis();
    let block_summary = summarize_sources(&sources);
    let manifest_cid_str = cid_codec::to_base32(&manifest_cid)?;
    let metadata = BackupMetadata {
        version: "1.0".to_string(),
        timestamp,
        space_name: opts.space_name.clone(),
        database_count: 1,
        total_blocks: blocks.len() as u64,
        total_entries: entry_count,
        manifest_cid: manifest_cid_str.clone(),
        car_cid: cid_codec::to_base32(&car_cid)?,
        databases: vec![DatabaseSummary {
            address: address.clone(),
            name: database_name.clone(),
            db_type: database_type,
            manifest_cid: manifest_cid_str,
            entry_count,
        }],
        block_summary,
    };
    let metadata_bytes = metadata.to_json()?;
    let iso_timestamp = metadata.iso_timestamp();
    let metadata_file_name = crate::metadata_file_name(&iso_timestamp);
    let car_file_name = crate::car_file_name(&iso_timestamp);

    let space = opts.space_name.clone();
    let metadata_cid = retry::with_retry(
        &opts.retry,
        |err| err.retryable(),
        || async { Ok(remote.upload(&space, metadata_bytes.clone()).await?) },
    )
    .await?;

    info!(
        address = %address,
        blocks = blocks.len(),
        entries = entry_count,
        car_cid = %car_cid,
        metadata_cid = %metadata_cid,
        "backup complete"
    );

    opts.emit(BackupProgress::Done {
        metadata_cid: metadata_cid.to_string(),
    });

    Ok(BackupOutcome {
        manifest_cid,
        database_address: address,
        database_name,
        blocks_total: blocks.len() as u64,
        car_file_size,
        entry_count,
        timestamp,
        metadata_cid,
        car_cid,
        metadata_file_name,
        car_file_name,
    })
}

fn summarize_sources(sources: &HashMap<String, BlockSource>) -> HashMap<String, u64> {
    let mut summary = HashMap::new();
    for source in sources.values() {
        *summary.entry(source.as_str().to_string()).or_insert(0u64) += 1;
    }
    summary
}
