use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use super::types::GlobalConfig;
use crate::core::errors::PodProbeError;

const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./podprobe.toml",
    "./config/podprobe.toml",
    "~/.config/podprobe/podprobe.toml",
    "/etc/podprobe/podprobe.toml",
];

pub struct ConfigLoader;

fn invalid(message: impl Into<String>) -> PodProbeError {
    PodProbeError::InvalidConfig(message.into())
}

impl ConfigLoader {
    /// Load configuration from the custom path when given, else the first
    /// default location that holds a valid file, else defaults.
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        if let Some(path) = custom_path {
            if path.exists() {
                return Self::load_from_file(path)
                    .with_context(|| format!("Failed to load config from custom path: {:?}", path));
            }
            tracing::warn!("Custom config path does not exist: {:?}, falling back to defaults", path);
        }

        for default_path in DEFAULT_CONFIG_PATHS {
            let path = Self::expand_path(default_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                        continue;
                    }
                }
            }
        }

        tracing::info!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    pub fn validate_config(config: &GlobalConfig) -> Result<(), PodProbeError> {
        if config.network.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms must be greater than 0"));
        }

        let discovery = &config.discovery;
        for (name, ports) in [
            ("pod_ports", &discovery.pod_ports),
            ("auth_ports", &discovery.auth_ports),
            ("agent_ports", &discovery.agent_ports),
        ] {
            if ports.is_empty() {
                return Err(invalid(format!("{} cannot be empty", name)));
            }
            if ports.contains(&0) {
                return Err(invalid(format!("{} cannot contain port 0", name)));
            }
        }

        if discovery.suffixes.is_empty() {
            return Err(invalid("suffixes cannot be empty (use \"\" for the bare host name)"));
        }

        if !discovery.default_domain.starts_with('.') {
            return Err(invalid("default_domain must start with '.'"));
        }

        Ok(())
    }

    /// Expand paths with tilde
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(dirs) = directories::BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.network.connect_timeout_ms, 2000);
        assert_eq!(config.network.read_timeout_ms, 0);
        assert_eq!(config.discovery.pod_ports, vec![443, 8443]);
        assert_eq!(config.discovery.auth_ports, vec![8444, 8445, 8446]);
        assert_eq!(config.discovery.agent_ports, vec![443, 8444, 8445, 8446]);
        assert_eq!(config.discovery.suffixes, vec!["-api", ""]);
        assert!(config.discovery.relay_fallback);
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_custom_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[network]
connect_timeout_ms = 500
read_timeout_ms = 3000

[discovery]
default_domain = ".example.net"
pod_ports = [9443]
relay_fallback = false
"#;
        fs::write(&temp_file, config_content).unwrap();

        let config = ConfigLoader::load_with_custom_path(Some(temp_file.path())).unwrap();
        assert_eq!(config.network.connect_timeout_ms, 500);
        assert_eq!(config.network.read_timeout_ms, 3000);
        assert_eq!(config.discovery.default_domain, ".example.net");
        assert_eq!(config.discovery.pod_ports, vec![9443]);
        assert!(!config.discovery.relay_fallback);
        // untouched sections keep their defaults
        assert_eq!(config.discovery.auth_ports, vec![8444, 8445, 8446]);
        assert!(config.store.home.is_none());
    }

    #[test]
    fn test_validation_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        let invalid_config = r#"
[discovery]
auth_ports = []
"#;
        fs::write(&temp_file, invalid_config).unwrap();

        let result = ConfigLoader::load_with_custom_path(Some(temp_file.path()));
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("auth_ports cannot be empty"));
    }

    #[test]
    fn test_domain_needs_leading_dot() {
        let mut config = GlobalConfig::default();
        config.discovery.default_domain = "symphony.com".to_string();
        let err = ConfigLoader::validate_config(&config).unwrap_err();
        assert!(matches!(err, PodProbeError::InvalidConfig(_)));
        assert_eq!(err.to_string(), "invalid configuration: default_domain must start with '.'");
    }
}
