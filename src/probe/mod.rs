pub mod scan;

pub use scan::{Resolution, ScanResponse};

use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::core::certs::CertificateInfo;
use crate::core::credentials::AuthStyle;
use crate::core::errors::PodProbeError;
use crate::core::models::{HostTarget, Scheme, append_path, origin_url};

pub const MIME_HTML: &str = "text/html";
pub const MIME_JSON: &str = "application/json";

/// Response shape a probe insists on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Any,
    Html,
    Json,
}

impl ContentKind {
    pub fn mime(&self) -> Option<&'static str> {
        match self {
            ContentKind::Any => None,
            ContentKind::Html => Some(MIME_HTML),
            ContentKind::Json => Some(MIME_JSON),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One speculative HTTP(S) attempt. Built by the orchestrator, executed once
/// by the executor, then read.
#[derive(Debug, Clone)]
pub struct Probe {
    name: String,
    suffix: String,
    domain: String,
    port: u16,
    content: ContentKind,
    base_url: Url,
    probe_url: Url,

    method: Method,
    body: Option<String>,
    auth: AuthStyle,
    extract: Vec<String>,

    executed: bool,
    failed: bool,
    failed_cert_auth: bool,
    http_status: Option<u16>,
    json: Option<Value>,
    tags: BTreeMap<String, String>,
    root_cert: Option<CertificateInfo>,
    leaf_cert: Option<CertificateInfo>,
    diagnostic: Option<String>,
}

impl Probe {
    /// HTTPS probe of `name<suffix><domain>:port<base_path>`.
    pub fn new(host: &HostTarget, suffix: &str, port: u16, base_path: &str) -> Result<Self, PodProbeError> {
        Self::with_scheme(Scheme::Https, host, suffix, port, base_path)
    }

    /// Plain HTTP probe of the host root, used when TLS gets no answer.
    pub fn plain(host: &HostTarget, port: u16) -> Result<Self, PodProbeError> {
        Self::with_scheme(Scheme::Http, host, "", port, "/")
    }

    fn with_scheme(
        scheme: Scheme,
        host: &HostTarget,
        suffix: &str,
        port: u16,
        base_path: &str,
    ) -> Result<Self, PodProbeError> {
        let origin = origin_url(scheme, &host.with_suffix(suffix), port)?;
        let base_url = append_path(&origin, base_path)?;

        Ok(Self {
            name: host.name.clone(),
            suffix: suffix.to_string(),
            domain: host.domain.clone(),
            port,
            content: ContentKind::Any,
            probe_url: base_url.clone(),
            base_url,
            method: Method::Get,
            body: None,
            auth: AuthStyle::None,
            extract: Vec::new(),
            executed: false,
            failed: true,
            failed_cert_auth: false,
            http_status: None,
            json: None,
            tags: BTreeMap::new(),
            root_cert: None,
            leaf_cert: None,
            diagnostic: None,
        })
    }

    /// Path below the base path that is actually requested, and the content
    /// type the answer must have.
    pub fn with_probe_path(mut self, path: &str, content: ContentKind) -> Result<Self, PodProbeError> {
        self.probe_url = append_path(&self.base_url, path)?;
        self.content = content;
        Ok(self)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthStyle) -> Self {
        self.auth = auth;
        self
    }

    /// Ask the executor to pull `tag` out of the JSON body or a server cookie.
    pub fn extract(mut self, tag: &str) -> Self {
        self.extract.push(tag.to_string());
        self
    }

    pub fn host_name(&self) -> String {
        format!("{}{}{}", self.name, self.suffix, self.domain)
    }

    pub fn host_and_port(&self) -> String {
        format!("{}:{}", self.host_name(), self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn content(&self) -> ContentKind {
        self.content
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn probe_url(&self) -> &Url {
        &self.probe_url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn auth(&self) -> AuthStyle {
        self.auth
    }

    pub fn tags_requested(&self) -> &[String] {
        &self.extract
    }

    #[cfg(test)]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_failed_cert_auth(&self) -> bool {
        self.failed_cert_auth
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn root_cert(&self) -> Option<&CertificateInfo> {
        self.root_cert.as_ref()
    }

    pub fn leaf_cert(&self) -> Option<&CertificateInfo> {
        self.leaf_cert.as_ref()
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub(crate) fn begin(&mut self) -> Result<(), PodProbeError> {
        if self.executed {
            return Err(PodProbeError::program_fault(format!(
                "probe {} executed twice",
                self.probe_url
            )));
        }
        self.executed = true;
        Ok(())
    }

    pub(crate) fn fail(&mut self, diagnostic: impl Into<String>) {
        self.failed = true;
        self.diagnostic = Some(diagnostic.into());
    }

    pub(crate) fn fail_cert_auth(&mut self, diagnostic: impl Into<String>) {
        self.failed_cert_auth = true;
        self.fail(diagnostic);
    }

    pub(crate) fn record_status(&mut self, status: u16) {
        self.http_status = Some(status);
    }

    pub(crate) fn record_certificates(&mut self, root: CertificateInfo, leaf: CertificateInfo) {
        self.root_cert = Some(root);
        self.leaf_cert = Some(leaf);
    }

    pub(crate) fn record_json(&mut self, json: Value) {
        self.json = Some(json);
    }

    pub(crate) fn record_tag(&mut self, name: &str, value: String) {
        self.tags.insert(name.to_string(), value);
    }

    pub(crate) fn succeed(&mut self) {
        self.failed = false;
        self.failed_cert_auth = false;
        self.diagnostic = None;
    }
}
