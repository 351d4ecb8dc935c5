//! The block extractor (C3): walk an open database down to every block a
//! CAR backup needs — manifest, access controller, identities, log entries.

use std::collections::{HashMap, HashSet};

use cid::Cid;
use serde::Deserialize;
use tracing::info;

use crate::block::{Block, BlockMap, BlockSource};
use crate::cid_codec::{self, Role};
use crate::engine::Database;
use crate::error::BridgeError;

pub struct ExtractedBlocks {
    pub blocks: BlockMap,
    pub sources: HashMap<String, BlockSource>,
    pub manifest_cid: Cid,
    pub database_name: String,
    pub database_type: String,
}

/// OrbitDB manifests point at their access controller with an IPFS path
/// string (`"/ipfs/<cid>"`) rather than a bare CID field (`spec.md` §3:
/// `{ name, type, accessController, meta? }`).
#[derive(Debug, Deserialize)]
struct ManifestDoc {
    name: String,
    #[serde(rename = "type")]
    db_type: String,
    #[serde(rename = "accessController")]
    access_controller: String,
}

fn parse_ipfs_path(path: &str) -> Result<Cid, BridgeError> {
    let cid_str = path.strip_prefix("/ipfs/").unwrap_or(path);
    cid_codec::parse(cid_str).map_err(|e| BridgeError::InvalidMetadata(e.to_string()))
}

pub async fn extract(db: &dyn Database) -> Result<ExtractedBlocks, BridgeError> {
    let manifest_cid = db.manifest_cid();
    let mut blocks = BlockMap::new();
    let mut sources = HashMap::new();

    insert_block(db, manifest_cid, BlockSource::Manifest, &mut blocks, &mut sources).await?;

    let manifest_bytes = blocks
        .get(&manifest_cid)
        .expect("manifest block was just inserted")
        .bytes
        .clone();
    let manifest: ManifestDoc = serde_ipld_dagcbor::from_slice(&manifest_bytes)
        .map_err(|e| BridgeError::InvalidMetadata(format!("manifest decode: {e}")))?;
    let access_controller_cid = parse_ipfs_path(&manifest.access_controller)?;
    insert_block(
        db,
        access_controller_cid,
        BlockSource::AccessController,
        &mut blocks,
        &mut sources,
    )
    .await?;

    let entries = db.all().await?;
    let mut seen_identities = HashSet::new();
    for (entry_cid, entry) in &entries {
        insert_block(db, *entry_cid, BlockSource::LogEntry, &mut blocks, &mut sources).await?;
        if seen_identities.insert(entry.identity) {
            insert_block(db, entry.identity, BlockSource::Identity, &mut blocks, &mut sources).await?;
        }
    }

    info!(
        blocks = blocks.len(),
        entries = entries.len(),
        identities = seen_identities.len(),
        "extracted blocks from database"
    );

    Ok(ExtractedBlocks {
        blocks,
        sources,
        manifest_cid,
        database_name: manifest.name,
        database_type: manifest.db_type,
    })
}

async fn insert_block(
    db: &dyn Database,
    cid: Cid,
    source: BlockSource,
    blocks: &mut BlockMap,
    sources: &mut HashMap<String, BlockSource>,
) -> Result<(), BridgeError> {
    let bytes = db
        .blockstore()
        .get(&cid)
        .await?
        .ok_or_else(|| BridgeError::Engine(format!("missing block for {cid}")))?;
    let key = cid_codec::stringify_for(&cid, Role::Remote)?;
    blocks.insert(Block::new(cid, bytes))?;
    sources.insert(key, source);
    Ok(())
}
