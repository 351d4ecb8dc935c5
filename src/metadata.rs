//! The backup metadata document (`spec.md` §3) — the JSON sidecar that
//! accompanies every CAR upload, letting the index (C6) sniff a remote
//! object without downloading and unpacking the CAR itself.

use std::collections::HashMap;

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub address: String,
    pub name: String,
    #[serde(rename = "type")]
    pub db_type: String,
    #[serde(rename = "manifestCID")]
    pub manifest_cid: String,
    #[serde(rename = "entryCount")]
    pub entry_count: u64,
}

/// The exact document shape of `spec.md` §3. `timestamp` is milliseconds
/// since the epoch — an integer, not an ISO string — per the literal
/// spec; the human-readable ISO stamp used for backup-file naming
/// (`spec.md` §3 "Backup-file naming") is derived from it separately,
/// see [`crate::now_iso8601`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub version: String,
    pub timestamp: u64,
    #[serde(rename = "spaceName")]
    pub space_name: String,
    #[serde(rename = "databaseCount")]
    pub database_count: u64,
    #[serde(rename = "totalBlocks")]
    pub total_blocks: u64,
    #[serde(rename = "totalEntries")]
    pub total_entries: u64,
    #[serde(rename = "manifestCID")]
    pub manifest_cid: String,
    #[serde(rename = "carCID")]
    pub car_cid: String,
    pub databases: Vec<DatabaseSummary>,
    #[serde(rename = "blockSummary")]
    pub block_summary: HashMap<String, u64>,
}

impl BackupMetadata {
    pub fn to_json(&self) -> Result<Vec<u8>, BridgeError> {
        serde_json::to_vec_pretty(self).map_err(|e| BridgeError::InvalidMetadata(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(bytes).map_err(|e| BridgeError::InvalidMetadata(e.to_string()))
    }

    pub fn manifest_cid(&self) -> Result<Cid, BridgeError> {
        crate::cid_codec::parse(&self.manifest_cid).map_err(BridgeError::from)
    }

    pub fn car_cid(&self) -> Result<Cid, BridgeError> {
        crate::cid_codec::parse(&self.car_cid).map_err(BridgeError::from)
    }

    /// The human-readable ISO stamp this backup's files are named with.
    pub fn iso_timestamp(&self) -> String {
        let secs = (self.timestamp / 1_000) as i64;
        let nanos = ((self.timestamp % 1_000) * 1_000_000) as u32;
        chrono::DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BackupMetadata {
        let mut block_summary = HashMap::new();
        block_summary.insert("manifest".to_string(), 1);
        block_summary.insert("log_entry".to_string(), 42);

        BackupMetadata {
            version: "1.0".to_string(),
            timestamp: 1_780_000_000_000,
            space_name: "test-restore-space".to_string(),
            database_count: 1,
            total_blocks: 44,
            total_entries: 42,
            manifest_cid: "bafyreigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string(),
            car_cid: "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string(),
            databases: vec![DatabaseSummary {
                address: "/orbitdb/bafyrei.../notes".to_string(),
                name: "notes".to_string(),
                db_type: "events".to_string(),
                manifest_cid: "bafyreigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string(),
                entry_count: 42,
            }],
            block_summary,
        }
    }

    #[test]
    fn round_trips_through_json_with_camel_case_keys_and_integer_timestamp() {
        let metadata = sample();
        let bytes = metadata.to_json().unwrap();
        let json_text = String::from_utf8(bytes.clone()).unwrap();
        assert!(json_text.contains("\"manifestCID\""));
        assert!(json_text.contains("\"blockSummary\""));
        assert!(json_text.contains("\"timestamp\": 1780000000000"));
        assert!(!json_text.contains("\"timestamp\": \""));

        let decoded = BackupMetadata::from_json(&bytes).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(BackupMetadata::from_json(b"not json").is_err());
    }

    #[test]
    fn iso_timestamp_is_derived_from_millis() {
        let metadata = sample();
        assert!(metadata.iso_timestamp().starts_with("20"));
    }
}
