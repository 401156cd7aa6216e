use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::endpoints::*;
use super::work::{AGENT_PROBE_WORK, AUTH_PROBE_WORK, PROBE_POD_WORK, SAVE_CONFIG_WORK, SubTask, total_work};
use crate::config::DiscoveryConfig;
use crate::core::certs::{CertificateInfo, CertificateSets};
use crate::core::credentials::{AuthStyle, CredentialContext, TokenKind};
use crate::core::errors::PodProbeError;
use crate::core::events::{Event, EventSink};
use crate::core::models::{
    AgentConfig, DiscoveryDraft, HostTarget, PodConfig, Scheme, SessionIdentity, append_path, origin_url,
};
use crate::core::objectives::{ComponentStatus, Objective, ObjectiveId, ObjectiveTracker};
use crate::executors::ProbeExecutor;
use crate::probe::{ContentKind, Method, Probe, Resolution, ScanResponse};
use crate::storage::PodStore;

const PROBING: &str = "Probing...";
const NO_WEB_SERVER: &str = "There is no web server here";
const WEBSITE_NOT_POD: &str = "This is a website but not a pod";
const NO_POD_INFO: &str = "Can't get podinfo";
const UNABLE_TO_LOCATE_URL: &str = "Unable to locate URL";
const UNABLE_TO_AUTHENTICATE: &str = "Unable to authenticate";

/// How a run ended. Only `Completed` reaches the summary and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    NoWebServer,
    NotAPod,
    NoKeyManager,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub outcome: RunOutcome,
    pub pod: PodConfig,
    pub agent: AgentConfig,
    pub pod_healthy: bool,
    pub session_identity: Option<SessionIdentity>,
    pub trust_certs: Vec<CertificateInfo>,
    pub leaf_certs: Vec<CertificateInfo>,
    pub objectives: Vec<Objective>,
    pub saved: bool,
}

/// Drives one discovery run against one host. Strictly sequential: each
/// stage sees the tokens and URLs the previous stages found.
pub struct DiscoveryOrchestrator {
    host: HostTarget,
    settings: DiscoveryConfig,
    executor: ProbeExecutor,
    store: Arc<dyn PodStore>,
    events: EventSink,
    cancel: CancellationToken,
    overwrite: bool,
    client_cert: Option<String>,

    draft: DiscoveryDraft,
    certs: CertificateSets,
    tracker: ObjectiveTracker,
    creds: CredentialContext,
    existing: Option<PodConfig>,
    saved: bool,
}

impl DiscoveryOrchestrator {
    pub fn new(
        host: HostTarget,
        settings: DiscoveryConfig,
        executor: ProbeExecutor,
        store: Arc<dyn PodStore>,
        events: EventSink,
    ) -> Self {
        Self {
            draft: DiscoveryDraft::new(host.fqdn()),
            tracker: ObjectiveTracker::new(events.clone()),
            host,
            settings,
            executor,
            store,
            events,
            cancel: CancellationToken::new(),
            overwrite: false,
            client_cert: None,
            certs: CertificateSets::new(),
            creds: CredentialContext::new(),
            existing: None,
            saved: false,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace a configuration that is already saved for this host.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Describe the client certificate in use, for the summary.
    pub fn with_client_cert(mut self, description: impl Into<String>) -> Self {
        self.client_cert = Some(description.into());
        self
    }

    pub fn objectives(&self) -> Vec<Objective> {
        self.tracker.snapshot()
    }

    pub fn into_report(self, outcome: RunOutcome) -> ProbeReport {
        let mut pod = self.draft.pod;
        if pod.trust_certs.is_empty() {
            pod.trust_certs = self.certs.trust_certs().cloned().collect();
        }
        ProbeReport {
            outcome,
            trust_certs: pod.trust_certs.clone(),
            pod,
            agent: self.draft.agent,
            pod_healthy: self.draft.pod_healthy,
            session_identity: self.draft.session_identity,
            leaf_certs: self.certs.leaf_certs().cloned().collect(),
            objectives: self.tracker.snapshot(),
            saved: self.saved,
        }
    }

    pub async fn run(&mut self) -> Result<RunOutcome, PodProbeError> {
        let fqdn = self.host.fqdn();
        self.events.emit(Event::TaskBegin {
            title: format!("Probing {} for a Pod", fqdn),
            total_work: total_work(self.settings.pod_ports.len()),
        });
        for id in ObjectiveId::ALL {
            self.tracker.reset(id);
        }

        self.existing = match self.store.find_pod(&fqdn) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!("Could not read saved config for {}: {:#}", fqdn, e);
                None
            }
        };
        if self.existing.is_some() {
            self.events
                .say(format!("We have an existing config for {}", fqdn));
        }

        let result = self.discover().await;
        self.events.emit(Event::Finished);
        result
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn section(&self, title: &str) {
        self.events.title(title);
    }

    async fn execute(&mut self, probe: &mut Probe, expected: &[u16]) -> Result<(), PodProbeError> {
        self.executor
            .execute(probe, &self.creds, &mut self.certs, expected)
            .await
    }

    async fn discover(&mut self) -> Result<RunOutcome, PodProbeError> {
        for id in [ObjectiveId::Pod, ObjectiveId::PodApi, ObjectiveId::SessionAuth] {
            self.tracker.set(id, ComponentStatus::Starting, PROBING);
        }

        self.section("Probing for Pod");

        let ports = self.settings.pod_ports.clone();
        let mut skipped = PROBE_POD_WORK * ports.len() as u64;
        for port in ports {
            if self.cancelled() {
                self.events.worked(skipped);
                return Ok(RunOutcome::Cancelled);
            }

            self.probe_pod(port).await?;
            skipped -= PROBE_POD_WORK;

            if self.draft.pod.pod_url.is_some() {
                break;
            }
        }
        self.events.worked(skipped);

        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let Some(web_url) = self.draft.pod.web_url.clone() else {
            self.events.say("Probe did not even find a website.");
            self.tracker.fail_undetermined(NO_WEB_SERVER);
            return Ok(RunOutcome::NoWebServer);
        };

        let Some(pod_url) = self.draft.pod.pod_url.clone() else {
            self.section("Probe Reveals a Website but no Pod");
            self.events.field("Web URL", &web_url);
            self.tracker.fail_undetermined(WEBSITE_NOT_POD);
            return Ok(RunOutcome::NotAPod);
        };

        self.tracker.set_ok(ObjectiveId::Pod);
        self.settle_pod_endpoints();

        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let Some(key_manager) = self.locate_key_manager(&pod_url)? else {
            self.tracker
                .set(ObjectiveId::Pod, ComponentStatus::Failed, NO_POD_INFO);
            self.tracker.fail_undetermined(NO_POD_INFO);
            return Ok(RunOutcome::NoKeyManager);
        };

        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.probe_key_auth(&key_manager).await?;
        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.probe_agent().await?;
        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.summarize();
        if self.cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.save();
        Ok(RunOutcome::Completed)
    }

    /// The whole per-port cascade: web root, pod marker, health check,
    /// session auth, session info, check-auth and pod info.
    async fn probe_pod(&mut self, port: u16) -> Result<(), PodProbeError> {
        let mut task = SubTask::begin(&self.events, format!("Probing Port {}", port), PROBE_POD_WORK);

        let mut probe = Probe::new(&self.host, "", port, WEB_ROOT)?;
        self.execute(&mut probe, &[]).await?;

        // any HTTP answer makes this a website, whatever its status
        if probe.http_status().is_none() {
            if self.probe_non_ssl(port).await? {
                self.events.say("This is a non-SSL website");
            } else {
                self.events.say("This is not a website");
            }
            return Ok(());
        }
        if self.draft.pod.web_url.is_none() {
            self.draft.pod.web_url = Some(probe.probe_url().clone());
        }
        task.worked(1);
        if self.cancelled() {
            return Ok(());
        }

        let mut probe = Probe::new(&self.host, "", port, WEB_ROOT)?.with_probe_path(POD_CLIENT_PATH, ContentKind::Html)?;
        self.execute(&mut probe, &[]).await?;
        if probe.is_failed() {
            self.events.say("This is a website but not a Symphony Pod");
            return Ok(());
        }

        let mut health =
            Probe::new(&self.host, "", port, WEB_ROOT)?.with_probe_path(POD_HEALTHCHECK_PATH, ContentKind::Json)?;
        self.execute(&mut health, HEALTHCHECK_STATUS).await?;
        if health.is_failed() {
            self.events.say("This looks quite like a Symphony Pod, but it isn't");
            return Ok(());
        }
        task.worked(1);

        let Some(checks) = health.json().and_then(Value::as_object) else {
            self.events.say(
                "This looks like a Symphony Pod, but the healthcheck returns something other than an object",
            );
            return Ok(());
        };

        self.draft.pod.pod_url = Some(origin_url(Scheme::Https, &self.host.fqdn(), port)?);

        let mut healthy = true;
        for (field, value) in checks {
            if !is_truthy(value) {
                self.events.say(format!("{} is UNHEALTHY", field));
                healthy = false;
            }
        }
        self.draft.pod_healthy = healthy;
        if healthy {
            self.events.say("We found a Symphony Pod!");
        } else {
            self.events.say("We found a Symphony Pod, but it's not feeling well");
        }
        if self.cancelled() {
            return Ok(());
        }

        self.section("Probing for API Sessionauth");
        let host = self.host.clone();
        let response = self.scan_auth("Session Auth", SESSION_AUTH_BASE, &host).await?;
        task.worked(1);
        if self.cancelled() {
            return Ok(());
        }

        if let Some(token) = response.tag(TOKEN_TAG) {
            self.remember_token(TokenKind::Session, token);
        }
        self.draft.pod.session_auth_url = self.resolve_url(&response, Some(TOKEN_TAG));

        if self.draft.pod.session_auth_url.is_some() {
            self.probe_session_info(port).await?;
        }
        task.worked(1);
        if self.cancelled() {
            return Ok(());
        }

        let mut check = Probe::new(&self.host, "", port, WEB_ROOT)?
            .with_probe_path(CHECK_AUTH_PATH, ContentKind::Json)?
            .with_auth(AuthStyle::Cookie);
        self.execute(&mut check, CHECK_AUTH_STATUS).await?;
        task.worked(1);
        if check.is_failed() {
            self.events.say("Can't do checkauth from this Pod.");
            return Ok(());
        }

        match check
            .json()
            .and_then(|j| j.get(CHECK_AUTH_KEY_MANAGER))
            .and_then(Value::as_str)
            .and_then(|text| Url::parse(text).ok())
        {
            Some(url) => {
                self.events.say(format!("keyManagerUrl is {}", url));
                self.draft.pod.key_manager_url = Some(url);
            }
            None => self.events.say("Invalid checkAuth response"),
        }
        if self.cancelled() {
            return Ok(());
        }

        let mut info = Probe::new(&self.host, "", port, WEB_ROOT)?
            .with_probe_path(POD_INFO_PATH, ContentKind::Json)?
            .with_auth(AuthStyle::Cookie);
        self.execute(&mut info, &[]).await?;
        task.worked(1);
        if info.is_failed() {
            self.events.say("Can't get podInfo from this Pod.");
            return Ok(());
        }

        let Some(data) = info
            .json()
            .and_then(|j| j.get(POD_INFO_DATA))
            .filter(|d| d.is_object())
        else {
            self.events
                .say("This looks like a Symphony Pod, but the podInfo returns something unexpected");
            return Ok(());
        };

        self.draft.pod.pod_id = data.get(POD_INFO_POD_ID).and_then(Value::as_i64);
        match data
            .get(POD_INFO_KEY_MANAGER)
            .and_then(Value::as_str)
            .and_then(|text| Url::parse(text).ok())
        {
            Some(url) => self.draft.pod.key_manager_url = Some(url),
            None => self.events.say("podInfo does not name a key manager"),
        }

        Ok(())
    }

    /// Plain HTTP on a port where TLS got no answer. Any 200 counts.
    async fn probe_non_ssl(&mut self, port: u16) -> Result<bool, PodProbeError> {
        let mut probe = Probe::plain(&self.host, port)?;
        self.execute(&mut probe, &[]).await?;

        if let Some(status) = probe.http_status() {
            self.events
                .say(format!("response from {} = {}", probe.probe_url(), status));
        }
        if probe.is_failed() {
            return Ok(false);
        }
        if self.draft.pod.web_url.is_none() {
            self.draft.pod.web_url = Some(probe.probe_url().clone());
        }
        Ok(true)
    }

    async fn probe_session_info(&mut self, port: u16) -> Result<(), PodProbeError> {
        let mut probe = Probe::new(&self.host, "", port, POD_API_BASE)?
            .with_probe_path(SESSION_INFO_PATH, ContentKind::Json)?
            .with_auth(AuthStyle::Cookie);
        for field in &self.settings.session_info_fields {
            probe = probe.extract(field);
        }
        self.execute(&mut probe, &[]).await?;

        if let Some(json) = probe.json() {
            tracing::debug!("sessioninfo JSON={}", json);
        }
        if probe.http_status().is_some() {
            self.draft.pod.pod_api_url = Some(probe.base_url().clone());
        }

        let authenticated = !probe.is_failed();
        if authenticated {
            self.events
                .say(format!("found pod API endpoint at {}", probe.base_url()));
        } else {
            self.events.say("Failed to connect to POD API");
        }

        let fields: Vec<(String, Option<String>)> = self
            .settings
            .session_info_fields
            .iter()
            .map(|field| (field.clone(), probe.tag(field).map(str::to_string)))
            .collect();
        if authenticated {
            for (field, value) in &fields {
                self.events.field(field, value.as_deref().unwrap_or("null"));
            }
        }

        self.draft.session_identity = Some(SessionIdentity { authenticated, fields });
        Ok(())
    }

    fn settle_pod_endpoints(&mut self) {
        if self.draft.pod.pod_api_url.is_some() {
            self.tracker.set_ok(ObjectiveId::PodApi);
        } else {
            self.tracker
                .set(ObjectiveId::PodApi, ComponentStatus::Failed, UNABLE_TO_LOCATE_URL);
        }

        if self.draft.pod.session_auth_url.is_none() {
            self.tracker
                .set(ObjectiveId::SessionAuth, ComponentStatus::Failed, UNABLE_TO_LOCATE_URL);
        } else if self.creds.token(TokenKind::Session).is_none() {
            self.tracker
                .set(ObjectiveId::SessionAuth, ComponentStatus::Warning, UNABLE_TO_AUTHENTICATE);
        } else {
            self.tracker.set_ok(ObjectiveId::SessionAuth);
        }
    }

    /// Use the key manager the pod reported, else the relay on the pod
    /// itself when allowed. Returns the key manager host split into name and
    /// domain.
    fn locate_key_manager(&mut self, pod_url: &Url) -> Result<Option<HostTarget>, PodProbeError> {
        if self.draft.pod.key_manager_url.is_none() && self.settings.relay_fallback {
            self.events
                .say("No podInfo, try to look for an in-cloud key manager...");
            self.draft.pod.key_manager_url = Some(append_path(pod_url, RELAY_PATH)?);
        }

        let Some(url) = self.draft.pod.key_manager_url.clone() else {
            return Ok(None);
        };
        let Some(host) = url.host_str() else {
            self.events
                .say(format!("Key manager URL {} has no host", url));
            return Ok(None);
        };

        self.tracker
            .set(ObjectiveId::KeyManager, ComponentStatus::Starting, PROBING);

        let key_manager = HostTarget::split(host, &self.settings.default_domain);
        self.events.field("keyManagerName", &key_manager.name);
        self.events.field("keyManagerDomain", &key_manager.domain);
        self.events.say(format!("Found key manager at {}", url));
        self.tracker.set_ok(ObjectiveId::KeyManager);

        Ok(Some(key_manager))
    }

    async fn probe_key_auth(&mut self, key_manager: &HostTarget) -> Result<(), PodProbeError> {
        self.section("Probing for API Keyauth");
        self.tracker
            .set(ObjectiveId::KeyAuth, ComponentStatus::Starting, PROBING);
        let _task = SubTask::begin(&self.events, "Probing for API Keyauth", AUTH_PROBE_WORK);

        let response = self.scan_auth("Key Auth", KEY_AUTH_BASE, key_manager).await?;
        if self.cancelled() {
            return Ok(());
        }

        self.draft.pod.key_auth_url = self.resolve_url(&response, Some(TOKEN_TAG));
        if let Some(token) = response.tag(TOKEN_TAG) {
            self.remember_token(TokenKind::KeyManager, token);
        }

        if self.draft.pod.key_auth_url.is_none() {
            self.tracker
                .set(ObjectiveId::KeyAuth, ComponentStatus::Failed, UNABLE_TO_LOCATE_URL);
        } else if self.creds.token(TokenKind::KeyManager).is_none() {
            self.tracker
                .set(ObjectiveId::KeyAuth, ComponentStatus::Warning, UNABLE_TO_AUTHENTICATE);
        } else {
            self.tracker.set_ok(ObjectiveId::KeyAuth);
        }
        Ok(())
    }

    async fn probe_agent(&mut self) -> Result<(), PodProbeError> {
        self.tracker
            .set(ObjectiveId::Agent, ComponentStatus::Starting, PROBING);
        let _task = SubTask::begin(&self.events, "Probing for API Agent", AGENT_PROBE_WORK);
        self.section("Probing for API Agent");

        let mut response = ScanResponse::new("Agent API");
        'scan: for suffix in self.settings.suffixes.clone() {
            for port in self.settings.agent_ports.clone() {
                if self.cancelled() {
                    return Ok(());
                }
                let mut probe = Probe::new(&self.host, &suffix, port, AGENT_BASE)?
                    .with_probe_path(AGENT_ECHO_PATH, ContentKind::Json)?
                    .with_method(Method::Post)
                    .with_body(AGENT_ECHO_BODY)
                    .with_auth(AuthStyle::Header);
                self.execute(&mut probe, &[]).await?;

                let found = !probe.is_failed();
                response.add(probe);
                if found {
                    break 'scan;
                }
            }
        }

        match self.resolve_url(&response, None) {
            Some(url) => {
                self.draft.agent = AgentConfig {
                    name: url.host_str().unwrap_or_default().to_string(),
                    agent_api_url: Some(url),
                };
                self.tracker.set_ok(ObjectiveId::Agent);
            }
            None => {
                self.tracker
                    .set(ObjectiveId::Agent, ComponentStatus::Failed, UNABLE_TO_LOCATE_URL);
            }
        }
        Ok(())
    }

    /// POST to `<base_path>/v1/authenticate` across suffixes and auth ports,
    /// stopping at the first endpoint that answers properly.
    async fn scan_auth(
        &mut self,
        title: &str,
        base_path: &str,
        host: &HostTarget,
    ) -> Result<ScanResponse, PodProbeError> {
        let mut response = ScanResponse::new(title);

        'scan: for suffix in self.settings.suffixes.clone() {
            for port in self.settings.auth_ports.clone() {
                if self.cancelled() {
                    break 'scan;
                }
                let mut probe = Probe::new(host, &suffix, port, base_path)?
                    .with_probe_path(AUTHENTICATE_PATH, ContentKind::Json)?
                    .with_method(Method::Post)
                    .extract(TOKEN_TAG);
                self.execute(&mut probe, &[]).await?;

                let found = !probe.is_failed();
                response.add(probe);
                if found {
                    break 'scan;
                }
            }
        }

        Ok(response)
    }

    /// Reduce a scan to a URL, narrating what was found. Ambiguous
    /// certificate-auth candidates yield nothing.
    fn resolve_url(&self, response: &ScanResponse, token_tag: Option<&str>) -> Option<Url> {
        let name = response.name();
        match response.resolve() {
            Resolution::Valid(url) => {
                let suffix = match token_tag {
                    None => "",
                    Some(tag) if response.tag(tag).is_some() => " and we authenticated!",
                    Some(_) => " but we failed to authenticate.",
                };
                self.events
                    .say(format!("Found {} endpoint at {}{}", name, url, suffix));
                Some(url)
            }
            Resolution::Probable(url) => {
                self.events
                    .say(format!("Found probable {} endpoint at {}", name, url));
                Some(url)
            }
            Resolution::Ambiguous(urls) => {
                for url in urls {
                    self.events
                        .say(format!("Found possible {} endpoint at {}", name, url));
                }
                None
            }
            Resolution::NotFound => {
                self.events
                    .say(format!("Failed to find any {} endpoint", name));
                None
            }
        }
    }

    fn remember_token(&mut self, kind: TokenKind, token: &str) {
        self.creds.record_token(kind, token);
        let fqdn = self.host.fqdn();
        if let Err(e) = self.store.save_session_token(&fqdn, kind, token) {
            tracing::warn!("Failed to save {} for {}: {:#}", kind.header_name(), fqdn, e);
        }
    }

    fn summarize(&mut self) {
        self.section("Probe Successful");

        let pod = &self.draft.pod;
        self.events.field("Web URL", display(&pod.web_url));
        self.events.field("Pod URL", display(&pod.pod_url));
        self.events.field("Pod ID", display(&pod.pod_id));
        self.events.field("Key Manager URL", display(&pod.key_manager_url));
        self.events.field("Session Auth URL", display(&pod.session_auth_url));
        self.events.field("Key Auth URL", display(&pod.key_auth_url));
        self.events.field("Pod API URL", display(&pod.pod_api_url));
        self.events
            .field("Agent API URL", display(&self.draft.agent.agent_api_url));

        if let Some(cert) = &self.client_cert {
            self.events.field("Client cert", cert);
            match &self.draft.session_identity {
                Some(identity) if identity.authenticated => {
                    self.events.say("We authenticated as");
                    for (field, value) in &identity.fields {
                        self.events.field(
                            &format!("userInfo.{}", field),
                            value.as_deref().unwrap_or("null"),
                        );
                    }
                }
                _ => self.events.say("This cert was not accepted for authentication"),
            }
        }

        self.events.say("Root server certs:");
        for cert in self.certs.trust_certs() {
            self.events.say(cert.subject.clone());
        }
        self.events.say("End server certs:");
        for cert in self.certs.leaf_certs() {
            self.events.say(cert.subject.clone());
        }

        self.draft.pod.trust_certs = self.certs.trust_certs().cloned().collect();
    }

    fn save(&mut self) {
        let fqdn = self.host.fqdn();
        if self.existing.is_some() && !self.overwrite {
            self.events.say(format!(
                "Not saving: a config for {} already exists (use --overwrite to replace it)",
                fqdn
            ));
            self.events.worked(SAVE_CONFIG_WORK);
            return;
        }

        let mut task = SubTask::begin(&self.events, "Saving Configuration", SAVE_CONFIG_WORK);
        match self.store.save(&self.draft.pod, &self.draft.agent) {
            Ok(()) => {
                self.saved = true;
                self.events.say(format!("Saved config for {}", fqdn));
            }
            Err(e) => {
                tracing::error!("Failed to save config for {}: {:#}", fqdn, e);
                self.events.say(format!("Failed to save config: {:#}", e));
            }
        }
        task.worked(1);
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn display<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "null".to_string())
}
