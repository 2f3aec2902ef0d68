use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::{Asset, OracleError, RateOracle};
use crate::providers::util::{http_client, with_retry};

const NAME: &str = "cryptocompare";

/// Quotes any asset against the reference through the CryptoCompare price API.
pub struct CryptoCompareOracle {
    base_url: String,
}

impl CryptoCompareOracle {
    pub fn new(base_url: &str) -> Self {
        CryptoCompareOracle {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn extract_rate(body: &HashMap<String, Value>, reference: &str) -> Result<f64, OracleError> {
    if body.get("Response").and_then(Value::as_str) == Some("Error") {
        let message = body
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(OracleError::malformed(NAME, message));
    }

    body.get(reference)
        .and_then(Value::as_f64)
        .ok_or_else(|| OracleError::malformed(NAME, format!("No {reference} price in response")))
}

#[async_trait]
impl RateOracle for CryptoCompareOracle {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(
        name = "CryptoCompareRateFetch",
        skip_all,
        fields(asset = %asset, reference = %reference)
    )]
    async fn query(&self, asset: &Asset, reference: &Asset) -> Result<f64, OracleError> {
        let url = format!(
            "{}/data/price?fsym={}&tsyms={}",
            self.base_url, asset.identifier, reference.identifier
        );
        debug!("Requesting price from {}", url);

        let client = http_client().map_err(|e| OracleError::unavailable(NAME, e))?;
        let response = with_retry(|| client.get(&url).send(), 2, 200)
            .await
            .map_err(|e| OracleError::unavailable(NAME, format!("Request error: {e}")))?;

        if !response.status().is_success() {
            return Err(OracleError::unavailable(
                NAME,
                format!("HTTP error: {}", response.status()),
            ));
        }

        let body: HashMap<String, Value> = response.json().await.map_err(|e| {
            OracleError::malformed(NAME, format!("Failed to parse JSON response: {e}"))
        })?;

        extract_rate(&body, &reference.identifier)
    }
}
