use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub network: NetworkConfig,
    pub discovery: DiscoveryConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_ms: u64,
    /// Overall deadline for a response once connected; 0 means none.
    pub read_timeout_ms: u64,
    pub user_agent: String,
    pub follow_redirects: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2000,
            read_timeout_ms: 0,
            user_agent: format!("podprobe / {}", env!("CARGO_PKG_VERSION")),
            follow_redirects: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Domain appended to bare host names, leading dot included.
    pub default_domain: String,
    pub pod_ports: Vec<u16>,
    pub auth_ports: Vec<u16>,
    pub agent_ports: Vec<u16>,
    pub suffixes: Vec<String>,
    /// Fall back to the in-cloud key manager relay on the pod when the pod
    /// does not report a key manager itself.
    pub relay_fallback: bool,
    pub session_info_fields: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_domain: ".symphony.com".to_string(),
            pod_ports: vec![443, 8443],
            auth_ports: vec![8444, 8445, 8446],
            agent_ports: vec![443, 8444, 8445, 8446],
            suffixes: vec!["-api".to_string(), String::new()],
            relay_fallback: true,
            session_info_fields: [
                "id",
                "emailAddress",
                "firstName",
                "lastName",
                "displayName",
                "company",
                "username",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where discovered pods are saved. Defaults to `$PODPROBE_HOME`, then
    /// `~/.podprobe`.
    pub home: Option<PathBuf>,
}
