use thiserror::Error;

/// Errors surfaced by the CID codec (C1).
#[derive(Debug, Error)]
pub enum CidError {
    #[error("invalid CID string: {0}")]
    InvalidCid(String),
    #[error("multihash decode failure: {0}")]
    Multihash(#[from] multihash::Error),
}

/// Errors surfaced by the CAR packer/unpacker (C2).
#[derive(Debug, Error)]
pub enum CarError {
    #[error("CAR header was malformed: {0}")]
    HeaderInvalid(String),
    #[error("block {cid} failed hash verification")]
    CorruptBlock { cid: String },
    #[error("CAR ended before the declared frame was fully read")]
    Truncated,
    #[error("varint encoding was malformed: {0}")]
    Varint(String),
    #[error(transparent)]
    Cid(#[from] CidError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The retryable sub-classification a remote-store fault may carry.
///
/// Kept as a structured enum rather than matched off an error string or
/// status-code substring — see Open Question 2 in `spec.md` §9: matching
/// the literal text `"429"` can misfire against a CID that happens to
/// contain that substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFault {
    NetworkReset,
    Dns,
    Timeout,
    TooManyRequests,
    ServiceUnavailable,
    GatewayTimeout,
    Other4xx,
    Other,
}

impl RemoteFault {
    /// Whether C8 should retry a fault of this kind.
    pub fn is_retryable(self) -> bool {
        !matches!(self, RemoteFault::Other4xx)
    }
}

/// Errors surfaced by the remote-store adapter (C4) and its gateway chain.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("upload failed: {fault:?}: {message}")]
    UploadFailed {
        fault: RemoteFault,
        message: String,
    },
    #[error("list_space failed: {fault:?}: {message}")]
    ListFailed {
        fault: RemoteFault,
        message: String,
    },
    #[error("download failed: {fault:?}: {message}")]
    DownloadFailed {
        fault: RemoteFault,
        message: String,
    },
    #[error("gateway {gateway} returned an error for {cid}: {reason}")]
    GatewayReturnedError {
        gateway: String,
        cid: String,
        reason: String,
    },
    #[error("gateway fallback is disabled and the network path failed: {0}")]
    GatewayFallbackDisabled(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl RemoteError {
    /// Classify the fault carried by this error, for the retry harness (C8).
    pub fn fault(&self) -> RemoteFault {
        match self {
            RemoteError::UploadFailed { fault, .. }
            | RemoteError::ListFailed { fault, .. }
            | RemoteError::DownloadFailed { fault, .. } => *fault,
            RemoteError::GatewayReturnedError { .. }
            | RemoteError::GatewayFallbackDisabled(_) => RemoteFault::Other4xx,
            RemoteError::Http(err) => classify_reqwest_error(err),
        }
    }

    pub fn retryable(&self) -> bool {
        self.fault().is_retryable()
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> RemoteFault {
    if err.is_timeout() {
        return RemoteFault::Timeout;
    }
    if let Some(status) = err.status() {
        return match status.as_u16() {
            429 => RemoteFault::TooManyRequests,
            503 => RemoteFault::ServiceUnavailable,
            504 => RemoteFault::GatewayTimeout,
            400..=499 => RemoteFault::Other4xx,
            _ => RemoteFault::Other,
        };
    }
    if err.is_connect() {
        return RemoteFault::NetworkReset;
    }
    RemoteFault::Other
}

/// The top-level error type for every public operation in this crate.
///
/// Every public operation returns `Result<T, BridgeError>` rather than
/// throwing — see `spec.md` §7, "this contract is load-bearing for UI
/// integrations that render progress".
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Cid(#[from] CidError),
    #[error(transparent)]
    Car(#[from] CarError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("backup metadata did not match the expected shape: {0}")]
    InvalidMetadata(String),
    #[error("credentials were not configured for this remote store")]
    MissingCredentials,
    #[error("no backup was found for space {space:?} after the retry budget was exhausted")]
    NoBackupFound { space: String },
    #[error("restore verification failed: expected {expected} entries, found {found}")]
    VerificationFailed { expected: u64, found: u64 },
    #[error("all {attempted} rediscovered head(s) failed to join the log")]
    HeadJoinFailed { attempted: u64 },
    #[error("database engine error: {0}")]
    Engine(String),
}

impl BridgeError {
    /// Whether the retry harness (C8) should retry an operation that failed
    /// with this error.
    pub fn retryable(&self) -> bool {
        match self {
            BridgeError::Remote(err) => err.retryable(),
            _ => false,
        }
    }
}
