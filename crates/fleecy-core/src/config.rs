//! fleecy.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Participant, SelectionCriteria};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleecyConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Defaults applied beneath every caller-supplied criteria record.
    #[serde(default)]
    pub criteria: SelectionCriteria,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Which collaborators back inventory listing and utilization queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// OpenStack compute inventory and Prometheus metrics.
    Live,
    /// Deterministic mock fleet and simulated usage.
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: ProviderMode,
    /// Port of the Prometheus server on the participant host.
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
    /// Timeout per collaborator request (e.g. "30s").
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_prometheus_port() -> u16 {
    9090
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            prometheus_port: default_prometheus_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.request_timeout).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unparseable request_timeout: {:?}",
                self.request_timeout
            ))
        })
    }
}

impl FleecyConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: FleecyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.provider.request_timeout()?;

        let mut seen = HashSet::new();
        for p in &self.participants {
            if p.id.trim().is_empty() {
                return Err(ConfigError::Invalid("participant with empty id".to_string()));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate participant id: {}",
                    p.id
                )));
            }
            if self.provider.mode == ProviderMode::Live {
                if p.openstack_endpoint.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "participant {} has no openstack_endpoint",
                        p.id
                    )));
                }
                if !p.has_credentials() {
                    return Err(ConfigError::Invalid(format!(
                        "participant {} has no application credential",
                        p.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn participant(&self, id: &str) -> ConfigResult<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ConfigError::UnknownParticipant(id.to_string()))
    }
}

/// Parse a duration string like "5s", "500ms", "1m", or plain seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
