//! The HTTP gateway fallback chain (`spec.md` §4.4): when the remote
//! store's own block-network path misses, fall back to fetching the block
//! by CID from a list of public IPFS gateways.

use cid::Cid;
use tracing::{debug, warn};

use crate::error::{RemoteError, RemoteFault};

/// Default gateways tried in order, matching `spec.md` §6's "Downloaded-via-
/// gateway path" naming of a default list while letting callers substitute
/// a private gateway for tests.
pub fn default_gateways() -> Vec<String> {
    vec![
        "https://w3s.link/ipfs".to_string(),
        "https://ipfs.io/ipfs".to_string(),
        "https://dweb.link/ipfs".to_string(),
    ]
}

/// Sniff whether `bytes` is an HTML error page rather than the block
/// content a gateway promised. Gateways sometimes answer a missing block
/// with a 200 and an HTML body instead of a clean 404 — `spec.md` §4.4
/// calls this out explicitly as something the chain must detect rather
/// than hand back as if it were valid block bytes.
pub fn is_error_page(content_type: Option<&str>, bytes: &[u8]) -> bool {
    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("text/html") {
            return true;
        }
    }
    let head = &bytes[..bytes.len().min(512)];
    let head_lower = String::from_utf8_lossy(head).to_ascii_lowercase();
    let trimmed = head_lower.trim_start();
    trimmed.starts_with("<!doctype") || trimmed.starts_with("<html") || trimmed.starts_with("<?xml")
}

pub struct GatewayChain {
    client: reqwest::Client,
    gateways: Vec<String>,
}

impl GatewayChain {
    pub fn new(client: reqwest::Client, gateways: Vec<String>) -> Self {
        Self { client, gateways }
    }

    pub fn with_defaults(client: reqwest::Client) -> Self {
        Self::new(client, default_gateways())
    }

    /// Try each configured gateway in order, returning the first block
    /// body that isn't an HTML error page. Honors `Retry-After` on 429/503
    /// by treating the response as that gateway's failure (callers retry
    /// the whole chain through C8, not this method in a loop by itself).
    pub async fn fetch(&self, cid: &Cid) -> Result<Vec<u8>, RemoteError> {
        if self.gateways.is_empty() {
            return Err(RemoteError::GatewayFallbackDisabled(
                "no gateways configured".to_string(),
            ));
        }

        let mut last_err = None;
        for gateway in &self.gateways {
            let url = format!("{gateway}/{cid}");
            match self.fetch_one(gateway, &url, cid).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    warn!(gateway = %gateway, cid = %cid, error = %err, "gateway fetch failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            RemoteError::GatewayFallbackDisabled("every gateway in the chain failed".to_string())
        }))
    }

    async fn fetch_one(&self, gateway: &str, url: &str, cid: &Cid) -> Result<Vec<u8>, RemoteError> {
        let response = self.client.get(url).send().await?;

        if let Some(retry_after) = response.headers().get(reqwest::header::RETRY_AFTER) {
            debug!(gateway, retry_after = ?retry_after, "gateway asked for backoff");
        }

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RemoteError::DownloadFailed {
                fault: RemoteFault::TooManyRequests,
                message: format!("{gateway} rate-limited the request"),
            });
        }
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(RemoteError::DownloadFailed {
                fault: RemoteFault::ServiceUnavailable,
                message: format!("{gateway} is unavailable"),
            });
        }
        if !status.is_success() {
            return Err(RemoteError::GatewayReturnedError {
                gateway: gateway.to_string(),
                cid: cid.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        if is_error_page(content_type.as_deref(), &bytes) {
            return Err(RemoteError::GatewayReturnedError {
                gateway: gateway.to_string(),
                cid: cid.to_string(),
                reason: "response body looked like an HTML error page".to_string(),
            });
        }
        Ok(bytes)
    }
}
