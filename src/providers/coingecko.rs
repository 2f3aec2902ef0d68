use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::{Asset, OracleError, RateOracle};
use crate::providers::util::{http_client, with_retry};

const NAME: &str = "coingecko";

/// CoinGecko identifies coins by slug rather than ticker.
const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("LTC", "litecoin"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("DAI", "dai"),
    ("USDC", "usd-coin"),
    ("ARB", "arbitrum"),
];

fn coin_id(identifier: &str) -> Option<&'static str> {
    COIN_IDS
        .iter()
        .find(|(ticker, _)| ticker.eq_ignore_ascii_case(identifier))
        .map(|(_, id)| *id)
}

/// Quotes crypto assets through the CoinGecko simple price API.
pub struct CoinGeckoOracle {
    base_url: String,
}

impl CoinGeckoOracle {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoOracle {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn extract_rate(
    body: &HashMap<String, Value>,
    coin: &str,
    vs_currency: &str,
) -> Result<f64, OracleError> {
    body.get(coin)
        .and_then(|prices| prices.get(vs_currency))
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            OracleError::malformed(NAME, format!("No {coin}/{vs_currency} price in response"))
        })
}

#[async_trait]
impl RateOracle for CoinGeckoOracle {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(
        name = "CoinGeckoRateFetch",
        skip_all,
        fields(asset = %asset, reference = %reference)
    )]
    async fn query(&self, asset: &Asset, reference: &Asset) -> Result<f64, OracleError> {
        let coin = match coin_id(&asset.identifier) {
            Some(coin) if asset.is_crypto() => coin,
            _ => {
                return Err(OracleError::Unsupported {
                    oracle: NAME.to_string(),
                    asset: asset.identifier.clone(),
                });
            }
        };
        let vs_currency = reference.identifier.to_lowercase();

        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies={}",
            self.base_url, coin, vs_currency
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

        extract_rate(&body, coin, &vs_currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn usd() -> Asset {
        Asset::new("USD", "United States Dollar", AssetKind::Fiat)
    }

    fn eth() -> Asset {
        Asset::new("ETH", "Ethereum", AssetKind::Crypto)
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ethereum": {"usd": 3150.5}}"#),
            )
            .mount(&mock_server)
            .await;

        let oracle = CoinGeckoOracle::new(&mock_server.uri());
        assert_eq!(oracle.query(&eth(), &usd()).await.unwrap(), 3150.5);
    }

    #[tokio::test]
    async fn test_fiat_and_unmapped_assets_are_unsupported() {
        // Nothing is mounted, so any request would fail with a 404
        let mock_server = MockServer::start().await;
        let oracle = CoinGeckoOracle::new(&mock_server.uri());

        let eur = Asset::new("EUR", "Euro", AssetKind::Fiat);
        let err = oracle.query(&eur, &usd()).await.unwrap_err();
        assert!(matches!(err, OracleError::Unsupported { .. }));

        let unmapped = Asset::new("ZZZ", "Unlisted coin", AssetKind::Crypto);
        let err = oracle.query(&unmapped, &usd()).await.unwrap_err();
        assert!(matches!(err, OracleError::Unsupported { .. }));

        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let oracle = CoinGeckoOracle::new(&mock_server.uri());
        let err = oracle.query(&eth(), &usd()).await.unwrap_err();
        assert!(matches!(err, OracleError::SourceMalformed { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let oracle = CoinGeckoOracle::new(&mock_server.uri());
        let err = oracle.query(&eth(), &usd()).await.unwrap_err();
        assert!(matches!(err, OracleError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_coin_id_lookup_ignores_case() {
        assert_eq!(coin_id("btc"), Some("bitcoin"));
        assert_eq!(coin_id("USDC"), Some("usd-coin"));
        assert_eq!(coin_id("EUR"), None);
    }
}
