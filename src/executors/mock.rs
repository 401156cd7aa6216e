//! In-memory transport for tests. Answers are keyed by full request URL;
//! anything unscripted is refused, the way a closed port would be.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::transport::{FailureKind, ProbeRequest, RawResponse, Transport, TransportFailure};
use crate::probe::{MIME_HTML, MIME_JSON};

#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, Result<RawResponse, TransportFailure>>,
    requests: Mutex<Vec<ProbeRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, response: RawResponse) -> Self {
        self.routes.insert(url.to_string(), Ok(response));
        self
    }

    pub fn fail(mut self, url: &str, kind: FailureKind, message: &str) -> Self {
        self.routes
            .insert(url.to_string(), Err(TransportFailure::new(kind, message)));
        self
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.url.to_string()).collect()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested_urls().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request.clone());
        self.routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(TransportFailure::new(FailureKind::Refused, "connection refused")))
    }
}

pub fn html(status: u16) -> RawResponse {
    RawResponse {
        status,
        content_type: Some(format!("{}; charset=utf-8", MIME_HTML)),
        body: "<html></html>".to_string(),
        cookies: Vec::new(),
        cert_chain: vec![b"leaf".to_vec(), b"root".to_vec()],
    }
}

pub fn json(status: u16, body: &str) -> RawResponse {
    RawResponse {
        status,
        content_type: Some(MIME_JSON.to_string()),
        body: body.to_string(),
        cookies: Vec::new(),
        cert_chain: vec![b"leaf".to_vec(), b"root".to_vec()],
    }
}
