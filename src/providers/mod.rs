pub mod coingecko;
pub mod cryptocompare;
pub mod manual;
pub mod util;
pub mod yahoo_finance;

use std::sync::Arc;
use tracing::debug;

use crate::core::config::{AppConfig, OracleKind};
use crate::core::{OracleChain, RateOracle};
use coingecko::CoinGeckoOracle;
use cryptocompare::CryptoCompareOracle;
use manual::ManualOracle;
use yahoo_finance::YahooOracle;

/// Builds the oracle chain in the priority order given by the configuration.
///
/// HTTP oracles without a provider section are left out of the chain.
pub fn build_chain(config: &AppConfig) -> OracleChain {
    let mut oracles: Vec<Arc<dyn RateOracle>> = Vec::with_capacity(config.oracles.len());
    for kind in &config.oracles {
        match kind {
            OracleKind::CryptoCompare => {
                if let Some(p) = &config.providers.cryptocompare {
                    oracles.push(Arc::new(CryptoCompareOracle::new(&p.base_url)));
                }
            }
            OracleKind::CoinGecko => {
                if let Some(p) = &config.providers.coingecko {
                    oracles.push(Arc::new(CoinGeckoOracle::new(&p.base_url)));
                }
            }
            OracleKind::Yahoo => {
                if let Some(p) = &config.providers.yahoo {
                    oracles.push(Arc::new(YahooOracle::new(&p.base_url)));
                }
            }
            OracleKind::Manual => oracles.push(Arc::new(ManualOracle::new(
                &config.reference_currency,
                config.manual_rates.clone(),
            ))),
        }
    }

    let chain = OracleChain::new(oracles, config.oracle_timeout());
    debug!(oracles = ?chain.oracle_names(), "Built oracle chain");
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProvidersConfig;

    #[test]
    fn test_chain_follows_configured_order() {
        let config = AppConfig {
            oracles: vec![
                OracleKind::Manual,
                OracleKind::Yahoo,
                OracleKind::CoinGecko,
                OracleKind::CryptoCompare,
            ],
            ..AppConfig::default()
        };
        let chain = build_chain(&config);
        assert_eq!(
            chain.oracle_names(),
            vec!["manual", "yahoo", "coingecko", "cryptocompare"]
        );
    }

    #[test]
    fn test_unconfigured_providers_are_skipped() {
        let config = AppConfig {
            providers: ProvidersConfig {
                yahoo: None,
                cryptocompare: None,
                coingecko: None,
            },
            ..AppConfig::default()
        };
        let chain = build_chain(&config);
        assert_eq!(chain.oracle_names(), vec!["manual"]);
    }

    #[test]
    fn test_default_chain_includes_coingecko() {
        let chain = build_chain(&AppConfig::default());
        assert_eq!(
            chain.oracle_names(),
            vec!["cryptocompare", "coingecko", "yahoo", "manual"]
        );
    }
}
