use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::asset::Asset;
use super::rate::Rate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    asset: String,
    reference: String,
}

impl CacheKey {
    fn new(asset: &Asset, reference: &Asset) -> Self {
        CacheKey {
            asset: asset.identifier.clone(),
            reference: reference.identifier.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    rate: Rate,
    fetched_at: DateTime<Utc>,
}

/// Time bounded store of resolved rates keyed by (asset, reference).
///
/// Expired entries are reported as absent but never evicted on read. Writers
/// overwrite unconditionally, so concurrent refreshes of a key settle on the
/// last write.
#[derive(Clone)]
pub struct RateCache {
    inner: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl RateCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
        }
    }

    pub async fn get(&self, asset: &Asset, reference: &Asset) -> Option<Rate> {
        self.get_at(asset, reference, Utc::now()).await
    }

    /// Looks up a rate as seen at `now`.
    pub async fn get_at(
        &self,
        asset: &Asset,
        reference: &Asset,
        now: DateTime<Utc>,
    ) -> Option<Rate> {
        let cache = self.inner.read().await;
        match cache.get(&CacheKey::new(asset, reference)) {
            Some(entry) if now - entry.fetched_at <= self.ttl => {
                debug!(asset = %asset, reference = %reference, "Cache HIT");
                Some(entry.rate)
            }
            Some(_) => {
                debug!(asset = %asset, reference = %reference, "Cache entry expired");
                None
            }
            None => {
                debug!(asset = %asset, reference = %reference, "Cache MISS");
                None
            }
        }
    }

    pub async fn put(
        &self,
        asset: &Asset,
        reference: &Asset,
        rate: Rate,
        timestamp: DateTime<Utc>,
    ) {
        let mut cache = self.inner.write().await;
        debug!(asset = %asset, reference = %reference, %rate, "Cache PUT");
        cache.insert(
            CacheKey::new(asset, reference),
            CacheEntry {
                rate,
                fetched_at: timestamp,
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
