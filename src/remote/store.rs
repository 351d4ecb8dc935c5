//! The `RemoteStore` contract: the remote CAS client this crate is
//! parameterized over (`spec.md` §6 — a Storacha/w3up-like service).

use async_trait::async_trait;
use cid::Cid;

use crate::error::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub cid: Cid,
    pub size: u64,
    pub uploaded_at: String,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload a CAR file to `space`, returning the root CID the remote
    /// service assigned it.
    async fn upload(&self, space: &str, car_bytes: Vec<u8>) -> Result<Cid, RemoteError>;

    /// List every object uploaded to `space`, most recent last.
    async fn list_space(&self, space: &str) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Fetch a single block's bytes through the store's own block-network
    /// path, if it exposes one. `Ok(None)` means the store doesn't have
    /// this block on the fast path — callers fall through to the gateway
    /// chain, never to a sentinel empty-bytes value (`spec.md` §9 Open
    /// Question 3).
    async fn download_block(&self, cid: &Cid) -> Result<Option<Vec<u8>>, RemoteError>;
}
