use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Args;
use crate::message::cache::DEFAULT_CACHE_CAPACITY;
use crate::pipeline::aggregator::DEFAULT_FLUSH_INTERVAL;
use crate::webhook::DEFAULT_TIMEOUT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("No webhook endpoint configured (set webhook.endpoint or DOCKHOOK_ENDPOINT)")]
    MissingEndpoint,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DockhookConfig {
    /// Name shown in digests. Falls back to the hostname.
    #[serde(default)]
    pub node_name: Option<String>,
    /// Seconds between flushes (default: 3)
    #[serde(default = "default_flush_interval")]
    pub flush_interval: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

fn default_flush_interval() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_secs()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds (default: 3)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DockerConfig {
    /// Announce containers that are already running when the watcher starts.
    #[serde(default)]
    pub show_running: bool,
    #[serde(default)]
    pub listen: ListenConfig,
}

/// Which kinds of Docker events are subscribed to.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ListenConfig {
    #[serde(default = "default_true")]
    pub container: bool,
    #[serde(default = "default_true")]
    pub volume: bool,
    #[serde(default = "default_true")]
    pub network: bool,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            container: true,
            volume: true,
            network: true,
        }
    }
}

impl ListenConfig {
    /// Docker event `type` filter values for the enabled listeners.
    pub fn event_types(&self) -> Vec<&'static str> {
        [
            (self.container, "container"),
            (self.volume, "volume"),
            (self.network, "network"),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

impl DockhookConfig {
    fn try_init_from_string(val: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(val)?)
    }

    /// Reads the config file. A missing file means defaults everywhere.
    pub fn try_init(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(config) => Self::try_init_from_string(&config),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {path:?} not found, using defaults");
                Self::try_init_from_string("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies command line and environment overrides and checks the result.
    pub fn resolve(mut self, args: &Args) -> Result<Self, ConfigError> {
        if let Some(endpoint) = &args.endpoint {
            self.webhook.endpoint = Some(endpoint.clone());
        }
        if let Some(node_name) = &args.node_name {
            self.node_name = Some(node_name.clone());
        }

        if self.webhook.endpoint.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.flush_interval == 0 {
            return Err(ConfigError::Zero("flush_interval"));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Zero("cache_capacity"));
        }
        if self.webhook.timeout == 0 {
            return Err(ConfigError::Zero("webhook.timeout"));
        }
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        self.webhook.endpoint.as_deref().unwrap_or_default()
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook.timeout)
    }

    /// The configured node name, or this machine's hostname.
    pub fn node_name(&self) -> String {
        match self.node_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => match nix::unistd::gethostname() {
                Ok(hostname) => hostname.to_string_lossy().into_owned(),
                Err(e) => {
                    log::warn!("Unable to read hostname: {e}");
                    String::new()
                }
            },
        }
    }
}
