use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::core::pipeline::RetryPolicy;
use crate::error::StartupError;

#[derive(Deserialize, Debug, Default)]
pub struct BotConfig {
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub gateway: Gateway,
    /// Per plugin string properties, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub emoji: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
pub struct Lifecycle {
    #[serde(default)]
    pub cluster: u64,
    #[serde(default = "default_shards")]
    pub shards: Vec<u64>,
    #[serde(default = "default_sync_deadline")]
    pub sync_deadline_secs: u64,
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    pub retry_limit: Option<u64>,
    pub retry_backoff_ms: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct Logging {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub directory: String,
    pub spec_file: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Gateway {
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    pub replay: Option<String>,
}

fn default_shards() -> Vec<u64> {
    vec![0]
}

fn default_sync_deadline() -> u64 {
    120
}

fn default_ready_timeout() -> u64 {
    300
}

fn default_level() -> String {
    String::from("info")
}

fn default_log_dir() -> String {
    String::from("logs")
}

fn default_event_buffer() -> usize {
    256
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle {
            cluster: 0,
            shards: default_shards(),
            sync_deadline_secs: default_sync_deadline(),
            ready_timeout_secs: default_ready_timeout(),
            retry_limit: None,
            retry_backoff_ms: None,
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level(),
            directory: default_log_dir(),
            spec_file: None,
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Gateway {
            event_buffer: default_event_buffer(),
            replay: None,
        }
    }
}

impl Lifecycle {
    pub fn sync_deadline(&self) -> Duration {
        Duration::from_secs(self.sync_deadline_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::unbounded();
        if let Some(limit) = self.retry_limit {
            policy = policy.with_max_retries(limit);
        }
        if let Some(ms) = self.retry_backoff_ms {
            policy = policy.with_backoff(Duration::from_millis(ms));
        }
        policy
    }
}

impl BotConfig {
    pub fn new(filename: &str) -> Result<Self, StartupError> {
        let config_file = fs::read_to_string(filename).map_err(StartupError::NoConfig)?;
        Self::parse(&config_file)
    }

    pub fn parse(raw: &str) -> Result<Self, StartupError> {
        toml::from_str(raw).map_err(StartupError::InvalidConfig)
    }

    /// Properties for a plugin, empty when the config has no section for it.
    pub fn plugin_properties(&self, plugin: &str) -> HashMap<String, String> {
        self.plugins.get(plugin).cloned().unwrap_or_default()
    }
}
