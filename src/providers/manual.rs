use async_trait::async_trait;
use std::collections::HashMap;

use crate::core::{Asset, OracleError, RateOracle};

const NAME: &str = "manual";

/// Fixed rates from configuration, expressed in the configured reference currency.
pub struct ManualOracle {
    reference: String,
    rates: HashMap<String, f64>,
}

impl ManualOracle {
    pub fn new(reference: &str, rates: HashMap<String, f64>) -> Self {
        ManualOracle {
            reference: reference.to_string(),
            rates,
        }
    }
}

#[async_trait]
impl RateOracle for ManualOracle {
    fn name(&self) -> &str {
        NAME
    }

    async fn query(&self, asset: &Asset, reference: &Asset) -> Result<f64, OracleError> {
        if reference.identifier != self.reference {
            return Err(OracleError::Unsupported {
                oracle: NAME.to_string(),
                asset: format!("{}/{}", asset.identifier, reference.identifier),
            });
        }
        self.rates
            .get(&asset.identifier)
            .copied()
            .ok_or_else(|| OracleError::Unsupported {
                oracle: NAME.to_string(),
                asset: asset.identifier.clone(),
            })
    }
}
