//! CLI configuration.
//!
//! Stored as TOML in the platform config dir, e.g.
//! `~/.config/taskbell/client.toml` on Linux. Command-line flags override
//! whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use taskbell_client::ClientConfig;
use taskbell_protocol::constants::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL};
use taskbell_protocol::{ConfigError, ConnectTarget};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Server host, with optional port.
    #[serde(default = "default_host")]
    pub host: String,

    /// Use `wss://` for host-based targets.
    #[serde(default)]
    pub secure: bool,

    /// Base URL override; wins over `host`/`secure` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub user_id: String,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Application-level ping cadence. Off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_interval_secs: Option<u64>,

    /// Track a toast per incoming reminder.
    #[serde(default = "default_true")]
    pub toasts: bool,
}

fn default_host() -> String {
    "localhost:8000".into()
}

fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL.as_millis() as u64
}

fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_true() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: false,
            base_url: None,
            user_id: String::new(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            ping_interval_secs: None,
            toasts: default_true(),
        }
    }
}

impl CliConfig {
    /// Loads `path`, or returns defaults if it does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Resolves the socket endpoint for the configured user.
    pub fn target(&self) -> Result<ConnectTarget, ConfigError> {
        match &self.base_url {
            Some(base) => ConnectTarget::with_base(base, &self.user_id),
            None => ConnectTarget::for_host(&self.host, self.secure, &self.user_id),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
            ping_interval: self.ping_interval_secs.map(Duration::from_secs),
            ..ClientConfig::default()
        }
    }
}

/// Default location of the config file.
pub fn config_path() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir().context("no config directory on this platform")?;
    Ok(base.join("taskbell").join("client.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CliConfig::default();
        assert_eq!(config.host, "localhost:8000");
        assert!(!config.secure);
        assert_eq!(config.reconnect_interval_ms, 3000);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert!(config.ping_interval_secs.is_none());
        assert!(config.toasts);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: CliConfig = toml::from_str(r#"user_id = "42""#).unwrap();
        assert_eq!(config.user_id, "42");
        assert_eq!(config.host, "localhost:8000");
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn host_target() {
        let config = CliConfig {
            host: "push.example.com".into(),
            secure: true,
            user_id: "42".into(),
            ..CliConfig::default()
        };
        assert_eq!(config.target().unwrap().url(), "wss://push.example.com/ws/42");
    }

    #[test]
    fn base_url_wins_over_host() {
        let config = CliConfig {
            base_url: Some("ws://10.0.0.5:9000".into()),
            user_id: "42".into(),
            ..CliConfig::default()
        };
        assert_eq!(config.target().unwrap().url(), "ws://10.0.0.5:9000/ws/42");
    }

    #[test]
    fn missing_user_is_config_error() {
        let err = CliConfig::default().target().unwrap_err();
        assert_eq!(err, ConfigError::EmptyUserId);
    }

    #[test]
    fn client_config_conversion() {
        let config = CliConfig {
            reconnect_interval_ms: 500,
            max_reconnect_attempts: 2,
            ping_interval_secs: Some(20),
            ..CliConfig::default()
        };
        let client = config.client_config();
        assert_eq!(client.reconnect_interval, Duration::from_millis(500));
        assert_eq!(client.max_reconnect_attempts, 2);
        assert_eq!(client.ping_interval, Some(Duration::from_secs(20)));
    }

    #[test]
    fn config_path_is_namespaced() {
        let path = config_path().unwrap();
        assert!(path.ends_with("taskbell/client.toml"));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("client.toml");

        let config = CliConfig {
            user_id: "9".into(),
            base_url: Some("wss://push.example.com".into()),
            ..CliConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = CliConfig::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, CliConfig::default());
    }
}
