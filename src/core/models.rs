use serde::{Deserialize, Serialize};
use url::Url;

use super::certs::CertificateInfo;
use super::errors::PodProbeError;

/// Host under probe, split at the first '.' into a bare name and a domain
/// (which keeps its leading dot), so suffixes like `-api` can be spliced in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostTarget {
    pub name: String,
    pub domain: String,
}

impl HostTarget {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Split `host` at its first '.'. A host without a dot gets
    /// `default_domain`.
    pub fn split(host: &str, default_domain: &str) -> Self {
        match host.find('.') {
            Some(i) => Self::new(&host[..i], &host[i..]),
            None => Self::new(host, default_domain),
        }
    }

    pub fn fqdn(&self) -> String {
        self.with_suffix("")
    }

    pub fn with_suffix(&self, suffix: &str) -> String {
        format!("{}{}{}", self.name, suffix, self.domain)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Origin URL for a host and port, leaving the port out when it is the
/// scheme default.
pub fn origin_url(scheme: Scheme, host: &str, port: u16) -> Result<Url, PodProbeError> {
    if port == scheme.default_port() {
        create_url(&format!("{}://{}", scheme.as_str(), host))
    } else {
        create_url(&format!("{}://{}:{}", scheme.as_str(), host, port))
    }
}

/// Parse a URL we assembled ourselves. Failure is a bug, not a network
/// condition, hence `ProgramFault`.
pub fn create_url(text: &str) -> Result<Url, PodProbeError> {
    Url::parse(text).map_err(|e| PodProbeError::program_fault(format!("bad url {:?}: {}", text, e)))
}

/// Append `path` (which may carry a query) to `base`, collapsing duplicate
/// slashes at the join.
pub fn append_path(base: &Url, path: &str) -> Result<Url, PodProbeError> {
    let mut text = base.as_str().to_string();
    if path.starts_with('/') {
        while text.ends_with('/') {
            text.pop();
        }
    }
    text.push_str(path);
    create_url(&text)
}

/// The pod document handed to the store at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PodConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_api_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_manager_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_auth_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_auth_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<i64>,
    #[serde(default)]
    pub trust_certs: Vec<CertificateInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_api_url: Option<Url>,
}

/// Who the pod API says we are, as reported by the session-info endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub authenticated: bool,
    pub fields: Vec<(String, Option<String>)>,
}

/// Facts accumulated while a run is in flight. Owned by the orchestrator.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryDraft {
    pub pod: PodConfig,
    pub agent: AgentConfig,
    pub pod_healthy: bool,
    pub session_identity: Option<SessionIdentity>,
}

impl DiscoveryDraft {
    pub fn new(pod_name: impl Into<String>) -> Self {
        Self {
            pod: PodConfig {
                name: pod_name.into(),
                ..PodConfig::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_url_omits_default_port() {
        let url = origin_url(Scheme::Https, "acme.symphony.com", 443).unwrap();
        assert_eq!(url.as_str(), "https://acme.symphony.com/");

        let url = origin_url(Scheme::Https, "acme.symphony.com", 8443).unwrap();
        assert_eq!(url.as_str(), "https://acme.symphony.com:8443/");

        let url = origin_url(Scheme::Http, "acme.symphony.com", 443).unwrap();
        assert_eq!(url.as_str(), "http://acme.symphony.com:443/");
    }

    #[test]
    fn test_append_path_collapses_slashes() {
        let base = create_url("https://acme.symphony.com/").unwrap();
        let url = append_path(&base, "/relay").unwrap();
        assert_eq!(url.as_str(), "https://acme.symphony.com/relay");

        let base = create_url("https://acme.symphony.com:8444/sessionauth").unwrap();
        let url = append_path(&base, "/v1/authenticate").unwrap();
        assert_eq!(url.as_str(), "https://acme.symphony.com:8444/sessionauth/v1/authenticate");

        let url = append_path(&base, "/login/checkauth?type=user").unwrap();
        assert_eq!(url.query(), Some("type=user"));
    }

    #[test]
    fn test_create_url_is_program_fault() {
        let err = create_url("https://exa mple.com:99999").unwrap_err();
        assert!(err.is_program_fault());
    }

    #[test]
    fn test_host_target_suffix() {
        let host = HostTarget::new("acme", ".symphony.com");
        assert_eq!(host.fqdn(), "acme.symphony.com");
        assert_eq!(host.with_suffix("-api"), "acme-api.symphony.com");
    }

    #[test]
    fn test_host_split() {
        assert_eq!(
            HostTarget::split("km.acme.example.com", ".symphony.com"),
            HostTarget::new("km", ".acme.example.com")
        );
        assert_eq!(
            HostTarget::split("acme", ".symphony.com"),
            HostTarget::new("acme", ".symphony.com")
        );
    }
}
