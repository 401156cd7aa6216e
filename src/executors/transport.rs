use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::probe::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// What came back from one completed HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Cookies the server set, as name/value pairs.
    pub cookies: Vec<(String, String)>,
    /// DER certificates presented during the TLS handshake, leaf first.
    /// Empty for plain HTTP.
    pub cert_chain: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server aborted the handshake because it wants a client
    /// certificate we did not (or could not) present.
    CertAuthRequired,
    Tls,
    UnknownHost,
    Refused,
    Timeout,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Performs one HTTP(S) exchange. The only seam through which the crate
/// touches the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResponse, TransportFailure>;
}
