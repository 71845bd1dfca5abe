//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Which browser host the coordinator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// A Chromium instance reachable over the DevTools protocol.
    Cdp,
    /// In-process simulated browser, no Chromium required.
    Memory,
}

impl std::str::FromStr for BrowserBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cdp" | "chrome" => Ok(Self::Cdp),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("unknown browser backend: {}", other))),
        }
    }
}

/// Top-level PromptRelay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server port.
    pub port: u16,
    /// DevTools HTTP endpoint, e.g. `http://127.0.0.1:9222`.
    pub cdp_url: String,
    pub backend: BrowserBackend,
    /// Root data directory.
    pub data_dir: PathBuf,
    pub agent: AgentSettings,
}

impl RelayConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3010);

        let cdp_url = std::env::var("PROMPTRELAY_CDP_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9222".to_string());

        let backend = match std::env::var("PROMPTRELAY_BROWSER") {
            Ok(value) => value.parse()?,
            Err(_) => BrowserBackend::Cdp,
        };

        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let agent = AgentSettings::load(&data_dir);

        Ok(Self {
            port,
            cdp_url: cdp_url.trim_end_matches('/').to_string(),
            backend,
            data_dir,
            agent,
        })
    }
}

/// Page agent timings, persisted as `agent.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    /// Monitor ticks before giving up with a timeout.
    #[serde(default = "default_monitor_ceiling")]
    pub monitor_ceiling: u32,
    /// Ticks before the stall watch starts counting.
    #[serde(default = "default_stall_grace")]
    pub stall_grace: u32,
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,
    #[serde(default = "default_input_attempts")]
    pub input_attempts: u32,
    #[serde(default = "default_input_interval_ms")]
    pub input_interval_ms: u64,
    /// Pause between filling the input and pressing send.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_monitor_interval_ms() -> u64 {
    1000
}
fn default_monitor_ceiling() -> u32 {
    120
}
fn default_stall_grace() -> u32 {
    5
}
fn default_stall_threshold() -> u32 {
    3
}
fn default_input_attempts() -> u32 {
    10
}
fn default_input_interval_ms() -> u64 {
    500
}
fn default_settle_ms() -> u64 {
    200
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            monitor_interval_ms: default_monitor_interval_ms(),
            monitor_ceiling: default_monitor_ceiling(),
            stall_grace: default_stall_grace(),
            stall_threshold: default_stall_threshold(),
            input_attempts: default_input_attempts(),
            input_interval_ms: default_input_interval_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl AgentSettings {
    /// Load settings from `agent.json`, or return defaults.
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join("agent.json");
        match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Retry policy for locating the prompt input.
    pub fn input_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.input_attempts,
            Duration::from_millis(self.input_interval_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AgentSettings::load(dir.path());
        assert_eq!(settings, AgentSettings::default());
        assert_eq!(settings.monitor_ceiling, 120);
        assert_eq!(settings.monitor_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_settings_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("agent.json"),
            r#"{"monitorCeiling": 30, "inputAttempts": 4}"#,
        )
        .unwrap();
        let settings = AgentSettings::load(dir.path());
        assert_eq!(settings.monitor_ceiling, 30);
        assert_eq!(settings.input_retry().max_attempts, 4);
        assert_eq!(settings.stall_grace, 5);
    }

    #[test]
    fn test_settings_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agent.json"), "not json").unwrap();
        assert_eq!(AgentSettings::load(dir.path()), AgentSettings::default());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("memory".parse::<BrowserBackend>().unwrap(), BrowserBackend::Memory);
        assert_eq!("CDP".parse::<BrowserBackend>().unwrap(), BrowserBackend::Cdp);
        assert!("firefox".parse::<BrowserBackend>().is_err());
    }
}
