use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::{Asset, OracleError, RateOracle};
use crate::providers::util::{http_client, with_retry};

const NAME: &str = "yahoo";

/// Quotes fiat pairs and crypto tickers from the Yahoo Finance chart API.
pub struct YahooOracle {
    base_url: String,
}

impl YahooOracle {
    pub fn new(base_url: &str) -> Self {
        YahooOracle {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn symbol(asset: &Asset, reference: &Asset) -> String {
        if asset.is_crypto() {
            format!("{}-{}", asset.identifier, reference.identifier)
        } else {
            format!("{}{}=X", asset.identifier, reference.identifier)
        }
    }
}

#[derive(Debug, Deserialize)]
struct YahooCurrencyResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    result: Option<Vec<CurrencyChartItem>>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl RateOracle for YahooOracle {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(name = "YahooRateFetch", skip_all, fields(asset = %asset, reference = %reference))]
    async fn query(&self, asset: &Asset, reference: &Asset) -> Result<f64, OracleError> {
        let symbol = Self::symbol(asset, reference);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Requesting currency rate from {}", url);

        let client = http_client().map_err(|e| OracleError::unavailable(NAME, e))?;
        let response = with_retry(|| client.get(&url).send(), 2, 200)
            .await
            .map_err(|e| {
                OracleError::unavailable(
                    NAME,
                    format!("Request error: {e} for currency pair: {symbol}"),
                )
            })?;

        if !response.status().is_success() {
            return Err(OracleError::unavailable(
                NAME,
                format!("HTTP error: {} for currency pair: {}", response.status(), symbol),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| OracleError::unavailable(NAME, e))?;

        let data: YahooCurrencyResponse = serde_json::from_str(&text).map_err(|e| {
            OracleError::malformed(NAME, format!("Failed to parse JSON response for {symbol}: {e}"))
        })?;

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| {
                OracleError::malformed(
                    NAME,
                    format!("No rate data found for currency pair: {symbol}"),
                )
            })?;

        Ok(item.meta.regular_market_price)
    }
}
