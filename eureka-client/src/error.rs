use http::StatusCode;
use thiserror::Error;

/// A request never produced a response: connection refused, DNS failure, timeout.
#[derive(Error, Debug)]
#[error("request to {url} failed: {source}")]
pub struct TransportError {
    pub url: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(url: &str, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            url: url.to_owned(),
            source: source.into(),
        }
    }
}

/// Outcome of a single failed registry request.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("registry rejected the request with status {0}")]
    Rejected(StatusCode),
    #[error("cannot serialize instance descriptor: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Resolving the address to advertise failed. Never fatal: callers fall back to loopback.
#[derive(Error, Debug)]
#[error("cannot resolve external address: {0}")]
pub struct AddressResolutionError(pub String);

/// Enumeration of errors returned by `RegistryAgent` operations.
///
/// Transport failures and rejected requests are retried by the lifecycle and only show up
/// here when a bounded `RetryPolicy` runs out of attempts, or when deregistering.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("instance descriptor could not be serialized, attempt aborted: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("deregistration failed: {0}")]
    Deregistration(#[source] RegistryError),
    #[error("giving up after {attempts} failed attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: RegistryError,
    },
    #[error("cancelled by shutdown")]
    Cancelled,
}

/// A `RegistryAgent` could not be built from its configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("heartbeat interval must be greater than zero")]
    ZeroHeartbeatInterval,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
