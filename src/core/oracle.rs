//! Rate sources and the ordered fallback chain over them.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::asset::Asset;
use super::error::OracleError;
use super::rate::Rate;

/// A source able to quote an asset against a reference currency.
///
/// Implementations return the raw quoted value; validation of the value is
/// left to the chain.
#[async_trait]
pub trait RateOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, asset: &Asset, reference: &Asset) -> Result<f64, OracleError>;
}

/// Successful chain lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleHit {
    pub rate: Rate,
    pub oracle: String,
}

/// Every oracle in the chain failed for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainExhausted {
    pub asset: String,
    pub failures: Vec<OracleError>,
}

impl std::fmt::Display for ChainExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "all {} oracles failed for {}", self.failures.len(), self.asset)?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

/// Ordered list of oracles tried in priority order until one yields a valid rate.
#[derive(Clone)]
pub struct OracleChain {
    oracles: Vec<Arc<dyn RateOracle>>,
    timeout: Duration,
}

impl OracleChain {
    pub fn new(oracles: Vec<Arc<dyn RateOracle>>, timeout: Duration) -> Self {
        Self { oracles, timeout }
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    pub fn oracle_names(&self) -> Vec<&str> {
        self.oracles.iter().map(|o| o.name()).collect()
    }

    /// Worst case time spent on one asset when every oracle times out.
    pub fn worst_case(&self) -> Duration {
        self.timeout * self.oracles.len() as u32
    }

    pub async fn query(
        &self,
        asset: &Asset,
        reference: &Asset,
    ) -> Result<OracleHit, ChainExhausted> {
        let mut failures = Vec::with_capacity(self.oracles.len());

        for oracle in &self.oracles {
            let name = oracle.name();
            let call = tokio::time::timeout(self.timeout, oracle.query(asset, reference));
            let outcome = match call.await {
                Ok(result) => result.and_then(|value| {
                    Rate::new(value).ok_or_else(|| OracleError::InvalidRate {
                        oracle: name.to_string(),
                        rate: value,
                    })
                }),
                Err(_) => Err(OracleError::unavailable(
                    name,
                    format!("timed out after {:?}", self.timeout),
                )),
            };

            match outcome {
                Ok(rate) => {
                    debug!(oracle = name, asset = %asset, %rate, "Oracle returned rate");
                    return Ok(OracleHit {
                        rate,
                        oracle: name.to_string(),
                    });
                }
                Err(e) => {
                    debug!(oracle = name, asset = %asset, error = %e, "Oracle failed, trying next");
                    failures.push(e);
                }
            }
        }

        let exhausted = ChainExhausted {
            asset: asset.identifier.clone(),
            failures,
        };
        warn!("{exhausted}");
        Err(exhausted)
    }
}
