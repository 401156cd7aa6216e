use std::sync::Arc;

use serde_json::Value;

use super::transport::{FailureKind, ProbeRequest, RawResponse, Transport};
use crate::core::certs::CertificateSets;
use crate::core::credentials::CredentialContext;
use crate::core::errors::PodProbeError;
use crate::core::events::EventSink;
use crate::probe::{ContentKind, MIME_JSON, Probe};

/// Runs single probes. The only component that talks to the network and the
/// only one that adds to the run's certificate sets.
pub struct ProbeExecutor {
    transport: Arc<dyn Transport>,
    events: EventSink,
}

impl ProbeExecutor {
    pub fn new(transport: Arc<dyn Transport>, events: EventSink) -> Self {
        Self { transport, events }
    }

    /// Execute `probe` once and record the outcome on it. An empty `expected`
    /// list means exactly 200. Network trouble is recorded on the probe; the
    /// only error returned is a probe being executed twice.
    pub async fn execute(
        &self,
        probe: &mut Probe,
        creds: &CredentialContext,
        certs: &mut CertificateSets,
        expected: &[u16],
    ) -> Result<(), PodProbeError> {
        probe.begin()?;
        self.events.say(format!("Probing {}...", probe.probe_url()));

        let request = build_request(probe, creds);
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(failure) => {
                let narration = match failure.kind {
                    FailureKind::CertAuthRequired => {
                        probe.fail_cert_auth(failure.message);
                        format!("Certificate auth required for {}", probe.host_and_port())
                    }
                    FailureKind::Tls => {
                        probe.fail(failure.message);
                        format!("SSL problem to {}", probe.host_and_port())
                    }
                    FailureKind::UnknownHost => {
                        probe.fail(failure.message);
                        format!("{} is not a valid host name", probe.host_name())
                    }
                    FailureKind::Refused | FailureKind::Timeout => {
                        probe.fail(failure.message);
                        format!("Cannot connect to {}", probe.host_and_port())
                    }
                    FailureKind::Other => {
                        tracing::warn!("{}: {}", probe.probe_url(), failure.message);
                        let line = format!("Request to {} failed: {}", probe.host_and_port(), failure.message);
                        probe.fail(failure.message);
                        line
                    }
                };
                self.events.say(narration);
                return Ok(());
            }
        };

        probe.record_status(response.status);
        let accepted = if expected.is_empty() {
            response.status == 200
        } else {
            expected.contains(&response.status)
        };
        if !accepted {
            probe.fail(format!("HTTP status {}", response.status));
            self.events
                .say(format!("Failed with HTTP status {}", response.status));
            return Ok(());
        }

        if let Some((root, leaf)) = certs.absorb_chain(&response.cert_chain) {
            probe.record_certificates(root, leaf);
        }
        if let (Some(root), Some(leaf)) = (probe.root_cert(), probe.leaf_cert()) {
            self.events.say(format!("Root server cert {}", root.subject));
            self.events.say(format!("End server cert {}", leaf.subject));
        }

        if let Err(reason) = check_content(probe, &response) {
            self.events.say(&reason);
            probe.fail(reason);
            return Ok(());
        }

        for tag in probe.tags_requested().to_vec() {
            if let Some(value) = extract_tag(probe.json(), &response.cookies, &tag) {
                probe.record_tag(&tag, value);
            }
        }

        probe.succeed();
        Ok(())
    }
}

fn build_request(probe: &Probe, creds: &CredentialContext) -> ProbeRequest {
    let mut headers = Vec::new();
    if let Some(mime) = probe.content().mime() {
        headers.push(("Accept".to_string(), mime.to_string()));
    }
    creds.apply_to(probe.auth(), &mut headers);

    ProbeRequest {
        method: probe.method(),
        url: probe.probe_url().clone(),
        headers,
        body: probe.body().map(str::to_string),
    }
}

/// Check the content type the probe insists on and keep any JSON body.
fn check_content(probe: &mut Probe, response: &RawResponse) -> Result<(), String> {
    let content_type = response
        .content_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if let Some(mime) = probe.content().mime() {
        if !content_type.contains(mime) {
            return Err(format!(
                "Expected {} but got {}",
                mime,
                response.content_type.as_deref().unwrap_or("no content type")
            ));
        }
    }

    if content_type.contains(MIME_JSON) {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(json) => probe.record_json(json),
            Err(e) if probe.content() == ContentKind::Json => {
                return Err(format!("Invalid JSON from {}: {}", probe.probe_url(), e));
            }
            Err(e) => tracing::debug!("ignoring unparseable body from {}: {}", probe.probe_url(), e),
        }
    }

    Ok(())
}

/// A top-level scalar from the JSON body, else a cookie of the same name.
fn extract_tag(json: Option<&Value>, cookies: &[(String, String)], tag: &str) -> Option<String> {
    let from_body = json.and_then(|j| j.get(tag)).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    });

    from_body.or_else(|| {
        cookies
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, value)| value.clone())
    })
}
