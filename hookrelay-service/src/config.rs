use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

/// Process configuration, loaded from a YAML file (`config/config.yaml`
/// unless overridden on the command line).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisConfig,
}

/// The `redis` section: where the retry tiers live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub server: String,
    pub password: String,
    pub db: i64,
    /// Pool sizing knobs from the operational config surface. The shared
    /// multiplexed connection does not consume them.
    pub max_idle: u32,
    pub max_active: u32,
    pub protocol: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:6379".to_owned(),
            password: String::new(),
            db: 0,
            max_idle: 3,
            max_active: 64,
            protocol: "tcp".to_owned(),
        }
    }
}

impl RedisConfig {
    /// The connection URL for the store client.
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}/{}", self.server, self.db)
        } else {
            format!("redis://:{}@{}/{}", self.password, self.server, self.db)
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parse config file {}", path.display()))
    }
}
