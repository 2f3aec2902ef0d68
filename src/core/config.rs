use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use super::asset::AssetKind;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    CryptoCompare,
    CoinGecko,
    Yahoo,
    Manual,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CryptoCompareProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub cryptocompare: Option<CryptoCompareProviderConfig>,
    pub coingecko: Option<CoinGeckoProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
            cryptocompare: Some(CryptoCompareProviderConfig {
                base_url: "https://min-api.cryptocompare.com".to_string(),
            }),
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: "https://api.coingecko.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetConfig {
    pub identifier: String,
    pub name: String,
    pub kind: AssetKind,
}

const MAX_ORACLE_TIMEOUT_MS: u64 = 60_000;
const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

fn default_reference_currency() -> String {
    "USD".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    120
}

fn default_oracle_timeout_ms() -> u64 {
    5000
}

fn default_workers() -> usize {
    4
}

fn default_oracles() -> Vec<OracleKind> {
    vec![
        OracleKind::CryptoCompare,
        OracleKind::CoinGecko,
        OracleKind::Yahoo,
        OracleKind::Manual,
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_reference_currency")]
    pub reference_currency: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Oracles in priority order
    #[serde(default = "default_oracles")]
    pub oracles: Vec<OracleKind>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub manual_rates: HashMap<String, f64>,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            reference_currency: default_reference_currency(),
            cache_ttl_secs: default_cache_ttl_secs(),
            oracle_timeout_ms: default_oracle_timeout_ms(),
            workers: default_workers(),
            oracles: default_oracles(),
            providers: ProvidersConfig::default(),
            manual_rates: HashMap::new(),
            assets: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxq", "fxq")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Rejects values that would disable caching, oracles or workers.
    pub fn validate(&self) -> Result<()> {
        if self.oracle_timeout_ms == 0 || self.oracle_timeout_ms > MAX_ORACLE_TIMEOUT_MS {
            bail!(
                "oracle_timeout_ms must be between 1 and {MAX_ORACLE_TIMEOUT_MS}, got {}",
                self.oracle_timeout_ms
            );
        }
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            bail!(
                "cache_ttl_secs must be between 1 and {MAX_CACHE_TTL_SECS}, got {}",
                self.cache_ttl_secs
            );
        }
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}
