//! Configuration management for Montycoin

use crate::error::{ChainError, Result};
use crate::miner::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "montycoin.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            peer_timeout_ms: default_peer_timeout_ms(),
            bootstrap_peers: Vec::new(),
        }
    }
}

impl NetworkConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_genesis_receiver")]
    pub genesis_receiver: String,
    #[serde(default = "default_genesis_amount")]
    pub genesis_amount: u64,
    /// Answer every balance query with a fixed amount once a `"reward"`
    /// transaction exists. Only for matching the answers of older nodes.
    #[serde(default)]
    pub reward_sentinel_compat: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            genesis_receiver: default_genesis_receiver(),
            genesis_amount: default_genesis_amount(),
            reward_sentinel_compat: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_reward_amount")]
    pub reward_amount: u64,
    #[serde(default = "default_fee_receiver")]
    pub fee_receiver: String,
    #[serde(default = "default_fee_amount")]
    pub fee_amount: u64,
    /// Upper bound on a single proof search; 0 means unbounded.
    #[serde(default)]
    pub max_search_secs: u64,
    /// Identity credited with mining rewards; random when empty.
    #[serde(default)]
    pub node_id: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward_amount: default_reward_amount(),
            fee_receiver: default_fee_receiver(),
            fee_amount: default_fee_amount(),
            max_search_secs: 0,
            node_id: String::new(),
        }
    }
}

impl MiningConfig {
    pub fn search_budget(&self) -> Option<Duration> {
        (self.max_search_secs > 0).then(|| Duration::from_secs(self.max_search_secs))
    }
}

impl Config {
    /// Parse and validate configuration text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DIFFICULTY).contains(&self.mining.difficulty) {
            return Err(ChainError::Config(format!(
                "mining.difficulty must be between 1 and {}",
                MAX_DIFFICULTY
            )));
        }
        if self.ledger.genesis_receiver.trim().is_empty() {
            return Err(ChainError::Config(
                "ledger.genesis_receiver must not be empty".to_string(),
            ));
        }
        if self.mining.fee_receiver.trim().is_empty() {
            return Err(ChainError::Config(
                "mining.fee_receiver must not be empty".to_string(),
            ));
        }
        if self.network.peer_timeout_ms == 0 {
            return Err(ChainError::Config(
                "network.peer_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from `path`; a missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)?;
    Config::from_toml(&text)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_peer_timeout_ms() -> u64 {
    3_000
}

fn default_genesis_receiver() -> String {
    "miner_address".to_string()
}

fn default_genesis_amount() -> u64 {
    50
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_reward_amount() -> u64 {
    10
}

fn default_fee_receiver() -> String {
    "monty".to_string()
}

fn default_fee_amount() -> u64 {
    1
}
