//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.profilefan.toml` files.

use crate::aggregate::JoinStrategy;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".profilefan.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Worker pool settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Simulated backend latency.
    #[serde(default)]
    pub latency: LatencyConfig,

    /// Synthetic data settings.
    #[serde(default)]
    pub seed: SeedConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Read strategy used by `show` when none is given.
    #[serde(default)]
    pub join: JoinStrategy,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Threads available to backend calls. Defaults to host parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
        }
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Per-backend simulated latency, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_identity_ms")]
    pub identity_ms: u64,

    #[serde(default = "default_address_ms")]
    pub address_ms: u64,

    #[serde(default = "default_transactions_ms")]
    pub transactions_ms: u64,

    #[serde(default = "default_financial_ms")]
    pub financial_ms: u64,

    #[serde(default = "default_loyalty_ms")]
    pub loyalty_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            identity_ms: default_identity_ms(),
            address_ms: default_address_ms(),
            transactions_ms: default_transactions_ms(),
            financial_ms: default_financial_ms(),
            loyalty_ms: default_loyalty_ms(),
        }
    }
}

impl LatencyConfig {
    /// Same latency for every backend.
    pub fn uniform(ms: u64) -> Self {
        Self {
            identity_ms: ms,
            address_ms: ms,
            transactions_ms: ms,
            financial_ms: ms,
            loyalty_ms: ms,
        }
    }
}

fn default_identity_ms() -> u64 {
    100
}

fn default_address_ms() -> u64 {
    1000
}

fn default_transactions_ms() -> u64 {
    3000
}

fn default_financial_ms() -> u64 {
    2000
}

fn default_loyalty_ms() -> u64 {
    1000
}

/// Synthetic data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Customers `1..=customers` are generated.
    #[serde(default = "default_customers")]
    pub customers: u32,

    /// Fixed RNG seed for reproducible data.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            customers: default_customers(),
            rng_seed: None,
        }
    }
}

fn default_customers() -> u32 {
    9
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(workers) = args.workers {
            self.pool.worker_threads = workers;
        }
        if let Some(customers) = args.customers {
            self.seed.customers = customers;
        }
        if let Some(seed) = args.rng_seed {
            self.seed.rng_seed = Some(seed);
        }
        if let Some(ms) = args.latency_ms {
            self.latency = LatencyConfig::uniform(ms);
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
