use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::core::credentials::TokenKind;
use crate::core::errors::PodProbeError;
use crate::core::models::{AgentConfig, PodConfig};
use crate::utils::fs::{atomic_write, atomic_write_private};

const HOME_ENV: &str = "PODPROBE_HOME";
const POD_FILE: &str = "pod.json";
const AGENTS_DIR: &str = "agents";

/// Where discovered pods end up. The discovery engine only ever talks to
/// this trait.
pub trait PodStore: Send + Sync {
    fn find_pod(&self, fqdn: &str) -> Result<Option<PodConfig>>;

    fn save(&self, pod: &PodConfig, agent: &AgentConfig) -> Result<()>;

    fn save_session_token(&self, fqdn: &str, kind: TokenKind, token: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PodDocument {
    #[serde(flatten)]
    pod: PodConfig,
    saved_at: DateTime<Utc>,
}

/// JSON documents under `<home>/pods/<fqdn>/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    home: PathBuf,
}

impl FileStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the home directory from config, then `$PODPROBE_HOME`, then
    /// `~/.podprobe`.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        if let Some(home) = &config.home {
            return Ok(Self::new(home));
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(home)));
        }
        let dirs = directories::BaseDirs::new()
            .ok_or_else(|| PodProbeError::Store("could not find a home directory".to_string()))?;
        Ok(Self::new(dirs.home_dir().join(".podprobe")))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn pod_dir(&self, fqdn: &str) -> PathBuf {
        self.home.join("pods").join(fqdn)
    }

    fn pod_file(&self, fqdn: &str) -> PathBuf {
        self.pod_dir(fqdn).join(POD_FILE)
    }

    fn agent_file(&self, fqdn: &str, agent: &str) -> PathBuf {
        self.pod_dir(fqdn).join(AGENTS_DIR).join(format!("{}.json", agent))
    }

    pub fn token_file(&self, fqdn: &str, kind: TokenKind) -> PathBuf {
        self.pod_dir(fqdn).join(kind.header_name())
    }
}

impl PodStore for FileStore {
    fn find_pod(&self, fqdn: &str) -> Result<Option<PodConfig>> {
        let path = self.pod_file(fqdn);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read pod config: {:?}", path))?;
        let document: PodDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse pod config: {:?}", path))?;

        Ok(Some(document.pod))
    }

    fn save(&self, pod: &PodConfig, agent: &AgentConfig) -> Result<()> {
        if pod.name.is_empty() {
            return Err(PodProbeError::Store("cannot save a pod without a name".to_string()).into());
        }

        let document = PodDocument {
            pod: pod.clone(),
            saved_at: Utc::now(),
        };
        let path = self.pod_file(&pod.name);
        atomic_write(&path, &serde_json::to_vec_pretty(&document)?)?;
        tracing::info!("Saved pod config to {:?}", path);

        if agent.agent_api_url.is_some() && !agent.name.is_empty() {
            let path = self.agent_file(&pod.name, &agent.name);
            atomic_write(&path, &serde_json::to_vec_pretty(agent)?)?;
            tracing::info!("Saved agent config to {:?}", path);
        }

        Ok(())
    }

    fn save_session_token(&self, fqdn: &str, kind: TokenKind, token: &str) -> Result<()> {
        let path = self.token_file(fqdn, kind);
        atomic_write_private(&path, token.as_bytes())
            .with_context(|| format!("Failed to save {} for {}", kind.header_name(), fqdn))
    }
}
