//! The prioritized read chain (`spec.md` §4.4): try the remote store's own
//! block-network path first, then fall back to the HTTP gateway chain.

use cid::Cid;

use super::gateway::GatewayChain;
use super::store::RemoteStore;
use crate::error::RemoteError;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub allow_gateway_fallback: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            allow_gateway_fallback: true,
        }
    }
}

/// Fetch a block's bytes, trying the store's network path first and the
/// gateway chain second. A gateway is only consulted when the network path
/// reports a clean miss (`Ok(None)`) — a hard network fault is reported as
/// such rather than silently falling through.
pub async fn download(
    store: &dyn RemoteStore,
    gateways: &GatewayChain,
    cid: &Cid,
    opts: &DownloadOptions,
) -> Result<Vec<u8>, RemoteError> {
    match store.download_block(cid).await {
        Ok(Some(bytes)) => return Ok(bytes),
        Ok(None) => {}
        Err(err) if !opts.allow_gateway_fallback => {
            return Err(RemoteError::GatewayFallbackDisabled(err.to_string()));
        }
        Err(_) => {}
    }

    if !opts.allow_gateway_fallback {
        return Err(RemoteError::GatewayFallbackDisabled(format!(
            "block {cid} missing from the network path"
        )));
    }

    gateways.fetch(cid).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid_codec::{compute_cid, CODEC_RAW};
    use crate::error::RemoteFault;
    use async_trait::async_trait;

    enum StoreBehavior {
        CleanMiss,
        Throws,
    }

    struct FakeStore(StoreBehavior);

    #[async_trait]
    impl RemoteStore for FakeStore {
        async fn upload(&self, _space: &str, _car_bytes: Vec<u8>) -> Result<Cid, RemoteError> {
            unimplemented!()
        }

        async fn list_space(&self, _space: &str) -> Result<Vec<crate::remote::RemoteObject>, RemoteError> {
            unimplemented!()
        }

        async fn download_block(&self, _cid: &Cid) -> Result<Option<Vec<u8>>, RemoteError> {
            match self.0 {
                StoreBehavior::CleanMiss => Ok(None),
                StoreBehavior::Throws => Err(RemoteError::DownloadFailed {
                    fault: RemoteFault::NetworkReset,
                    message: "connection reset".to_string(),
                }),
            }
        }
    }

    fn cid() -> Cid {
        compute_cid(b"download-test", CODEC_RAW)
    }

    fn no_gateways() -> GatewayChain {
        GatewayChain::new(reqwest::Client::new(), vec![])
    }

    #[tokio::test]
    async fn disabled_fallback_surfaces_the_phrase_on_a_clean_miss() {
        let store = FakeStore(StoreBehavior::CleanMiss);
        let opts = DownloadOptions {
            allow_gateway_fallback: false,
        };
        let err = download(&store, &no_gateways(), &cid(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("gateway fallback is disabled"));
    }

    #[tokio::test]
    async fn disabled_fallback_surfaces_the_phrase_when_the_network_path_throws() {
        let store = FakeStore(StoreBehavior::Throws);
        let opts = DownloadOptions {
            allow_gateway_fallback: false,
        };
        let err = download(&store, &no_gateways(), &cid(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("gateway fallback is disabled"));
    }
}
