//! The backup index (C6): list backups in a space by downloading and
//! sniffing every object the remote store reports, since `list_space`
//! returns only CIDs, never filenames (`spec.md` §4.6).

use std::time::Duration;

use cid::Cid;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::metadata::BackupMetadata;
use crate::remote::{DownloadOptions, GatewayChain, RemoteStore};

/// Objects are processed this many at a time (`spec.md` §4.6 step 2).
const BATCH_SIZE: usize = 10;
/// Reject anything bigger than this; metadata documents are always small.
const MAX_METADATA_BYTES: usize = 100 * 1024;
/// Per-object download timeout while sniffing.
const SNIFF_TIMEOUT: Duration = Duration::from_secs(5);
/// Stop accumulating once this many matches are found.
const MAX_RESULTS: usize = 20;
/// Zero-match retry budget: the remote store is eventually consistent.
const DEFAULT_EMPTY_RESULT_RETRIES: u32 = 5;
const DEFAULT_EMPTY_RESULT_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ListBackupsOptions {
    pub space_name: Option<String>,
    pub allow_gateway_fallback: bool,
    /// How many times to retry a zero-match scan, per `spec.md` §4.6 step
    /// 4. Exposed (rather than hardcoded) so tests against a static
    /// remote snapshot aren't forced through the full 5×5s budget.
    pub empty_result_retries: u32,
    pub empty_result_pause: Duration,
}

impl Default for ListBackupsOptions {
    fn default() -> Self {
        Self {
            space_name: None,
            allow_gateway_fallback: true,
            empty_result_retries: DEFAULT_EMPTY_RESULT_RETRIES,
            empty_result_pause: DEFAULT_EMPTY_RESULT_PAUSE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub metadata_cid: Cid,
    pub metadata: BackupMetadata,
}

/// List every backup visible in the remote space, sorted by embedded
/// timestamp descending (`spec.md` §4.6).
pub async fn list_backups(
    remote: &dyn RemoteStore,
    gateways: &GatewayChain,
    space: &str,
    opts: &ListBackupsOptions,
) -> Result<Vec<BackupSummary>, BridgeError> {
    let download_opts = DownloadOptions {
        allow_gateway_fallback: opts.allow_gateway_fallback,
    };

    let mut attempt = 0u32;
    loop {
        let objects = remote.list_space(space).await?;
        let mut matches = scan(remote, gateways, &objects, opts, &download_opts).await;
        matches.sort_by(|a, b| b.metadata.timestamp.cmp(&a.metadata.timestamp));
        matches.truncate(MAX_RESULTS);

        if !matches.is_empty() || attempt >= opts.empty_result_retries {
            info!(space, found = matches.len(), attempt, "listed backups");
            return Ok(matches);
        }
        attempt += 1;
        debug!(space, attempt, "no backups found yet, retrying after pause");
        tokio::time::sleep(opts.empty_result_pause).await;
    }
}

async fn scan(
    remote: &dyn RemoteStore,
    gateways: &GatewayChain,
    objects: &[crate::remote::RemoteObject],
    opts: &ListBackupsOptions,
    download_opts: &DownloadOptions,
) -> Vec<BackupSummary> {
    let mut results = Vec::new();
    let mut batches = stream::iter(objects.chunks(BATCH_SIZE));
    while let Some(batch) = batches.next().await {
        let sniffed: Vec<_> = stream::iter(batch.iter())
            .map(|object| sniff_one(remote, gateways, object, download_opts))
            .buffer_unordered(BATCH_SIZE)
            .collect()
            .await;
        for sniffed in sniffed.into_iter().flatten() {
            if let Some(space_filter) = &opts.space_name {
                if &sniffed.metadata.space_name != space_filter {
                    continue;
                }
            }
            results.push(sniffed);
        }
        if results.len() >= MAX_RESULTS {
            break;
        }
    }
    results
}

async fn sniff_one(
    remote: &dyn RemoteStore,
    gateways: &GatewayChain,
    object: &crate::remote::RemoteObject,
    opts: &DownloadOptions,
) -> Option<BackupSummary> {
    let fetch = crate::remote::download(remote, gateways, &object.cid, opts);
    let bytes = match tokio::time::timeout(SNIFF_TIMEOUT, fetch).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) | Err(_) => return None,
    };
    classify(&bytes).map(|metadata| BackupSummary {
        metadata_cid: object.cid,
        metadata,
    })
}

/// The deterministic sniffing pipeline of `spec.md` §4.6 steps 2a–2e: a
/// small classifier, not exception-driven shape probing.
fn classify(bytes: &[u8]) -> Option<BackupMetadata> {
    if bytes.len() > MAX_METADATA_BYTES {
        return None;
    }
    let head = &bytes[..bytes.len().min(100)];
    if head
        .iter()
        .any(|b| b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r'))
    {
        return None;
    }
    let trimmed_start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    match bytes.get(trimmed_start) {
        Some(b'{') | Some(b'[') => {}
        _ => return None,
    }
    let metadata = BackupMetadata::from_json(bytes).ok()?;
    if metadata.databases.is_empty() {
        return None;
    }
    Some(metadata)
}

/// Surface a `NoBackupFound` error when the caller expected at least one
/// result and the scan came back empty after its retry budget.
pub fn require_one(
    mut summaries: Vec<BackupSummary>,
    space: &str,
) -> Result<BackupSummary, BridgeError> {
    if summaries.is_empty() {
        return Err(BridgeError::NoBackupFound {
            space: space.to_string(),
        });
    }
    Ok(summaries.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_metadata_bytes(space_name: &str, timestamp: u64) -> Vec<u8> {
        let json = serde_json::json!({
            "version": "1.0",
            "timestamp": timestamp,
            "spaceName": space_name,
            "databaseCount": 1,
            "totalBlocks": 3,
            "totalEntries": 1,
            "manifestCID": "bafyreigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi",
            "carCID": "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi",
            "databases": [{
                "address": "/orbitdb/bafyrei.../notes",
                "name": "notes",
                "type": "events",
                "manifestCID": "bafyreigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi",
                "entryCount": 1,
            }],
            "blockSummary": {},
        });
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn classifies_valid_metadata() {
        let bytes = valid_metadata_bytes("test-space", 42);
        let metadata = classify(&bytes).unwrap();
        assert_eq!(metadata.space_name, "test-space");
        assert_eq!(metadata.timestamp, 42);
    }

    #[test]
    fn rejects_binary_content() {
        let bytes = vec![0u8, 1, 2, 0x71, 0xa1, 0x00, 0xff];
        assert!(classify(&bytes).is_none());
    }

    #[test]
    fn rejects_json_without_databases() {
        let json = serde_json::json!({
            "version": "1.0",
            "timestamp": 1,
            "databases": [],
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(classify(&bytes).is_none());
    }

    #[test]
    fn rejects_oversized_objects() {
        let bytes = vec![b'{'; MAX_METADATA_BYTES + 1];
        assert!(classify(&bytes).is_none());
    }

    #[test]
    fn rejects_non_json_leading_bytes() {
        let bytes = b"not-json-at-all".to_vec();
        assert!(classify(&bytes).is_none());
    }

    #[test]
    fn require_one_errors_on_empty() {
        let err = require_one(vec![], "my-space").unwrap_err();
        assert!(matches!(err, BridgeError::NoBackupFound { .. }));
    }
}
