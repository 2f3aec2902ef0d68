//! Rate resolution for a batch of currency identifiers.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::asset::{Asset, AssetResolver, CurrencyIdentifier};
use super::cache::RateCache;
use super::error::ResolveError;
use super::oracle::OracleChain;
use super::rate::{Rate, ResolutionResult};

/// Resolves sets of identifiers into rates against a fixed reference asset.
pub struct RateEngine {
    resolver: Arc<dyn AssetResolver>,
    cache: RateCache,
    chain: OracleChain,
    reference: Asset,
}

impl RateEngine {
    pub fn new(
        resolver: Arc<dyn AssetResolver>,
        cache: RateCache,
        chain: OracleChain,
        reference: Asset,
    ) -> Self {
        Self {
            resolver,
            cache,
            chain,
            reference,
        }
    }

    pub fn reference(&self) -> &Asset {
        &self.reference
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Checks the request contract without touching cache or oracles.
    ///
    /// Returns the distinct identifiers in first-seen order.
    pub fn validate(identifiers: &[CurrencyIdentifier]) -> Result<Vec<String>, ResolveError> {
        if identifiers.is_empty() {
            return Err(ResolveError::EmptyRequest);
        }

        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let id = identifier.validated()?;
            if seen.insert(id) {
                valid.push(id.to_string());
            }
        }
        Ok(valid)
    }

    #[instrument(name = "ResolveRates", skip_all, fields(count = identifiers.len()))]
    pub async fn resolve(
        &self,
        identifiers: &[CurrencyIdentifier],
    ) -> Result<ResolutionResult, ResolveError> {
        let identifiers = Self::validate(identifiers)?;

        let assets: Vec<Asset> = identifiers
            .iter()
            .filter_map(|id| match self.resolver.resolve(id) {
                Ok(asset) => Some(asset),
                Err(e) => {
                    warn!(identifier = %id, error = %e, "Skipping identifier");
                    None
                }
            })
            .collect();

        let lookups = assets.iter().map(|asset| async move {
            let rate = self.rate_for(asset).await;
            (asset.identifier.clone(), rate)
        });

        let result: ResolutionResult = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, rate)| rate.map(|r| (id, r)))
            .collect();

        info!(
            requested = identifiers.len(),
            resolved = result.len(),
            reference = %self.reference,
            "Resolved rates"
        );
        Ok(result)
    }

    async fn rate_for(&self, asset: &Asset) -> Option<Rate> {
        if asset.identifier == self.reference.identifier {
            return Some(Rate::one());
        }

        if let Some(rate) = self.cache.get(asset, &self.reference).await {
            return Some(rate);
        }

        match self.chain.query(asset, &self.reference).await {
            Ok(hit) => {
                debug!(
                    asset = %asset,
                    oracle = %hit.oracle,
                    rate = %hit.rate,
                    "Caching oracle rate"
                );
                self.cache.put(asset, &self.reference, hit.rate, Utc::now()).await;
                Some(hit.rate)
            }
            // Failures are not cached so the next request retries the chain.
            Err(_) => None,
        }
    }
}
