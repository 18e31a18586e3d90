// Copyright 2025 Fleetlens Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Read-through result cache keyed by canonical query signatures.
//!
//! A hit must be indistinguishable from a recomputation with the same
//! query, so entries are immutable `Arc`s and the key is a total,
//! order-independent function of the query (built in `fleetlens-core`).
//! Entries leave only by TTL expiry or capacity eviction (moka's TinyLFU
//! policy, not FIFO). There is no negative caching: a failed pass stores
//! nothing and the next request recomputes.
//!
//! Concurrent misses for the same key are collapsed into one computation;
//! without that, identical dashboard queries landing together would each
//! re-stream a large export.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::AggregationOutput;
use crate::EngineError;

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    /// Maximum number of cached results.
    pub max_entries: u64,
    /// Time-to-live for cache entries.
    pub ttl: Duration,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// TTL'd cache of finalized aggregation results.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<String, Arc<AggregationOutput>>,
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { inner }
    }

    /// Return the cached result for `key`, or resolve `init` exactly once
    /// across all concurrent callers and cache its success. Errors
    /// propagate to every waiter and are never stored.
    pub async fn get_or_compute<F>(
        &self,
        key: String,
        init: F,
    ) -> Result<Arc<AggregationOutput>, EngineError>
    where
        F: Future<Output = Result<AggregationOutput, EngineError>>,
    {
        self.inner
            .try_get_with(key, async move { init.await.map(Arc::new) })
            .await
            .map_err(|e: Arc<EngineError>| (*e).clone())
    }

    /// Direct lookup, used by tests and the health endpoint.
    pub async fn get(&self, key: &str) -> Option<Arc<AggregationOutput>> {
        self.inner.get(key).await
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(ResultCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::GroupSummary;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn totals(driver_count: u64) -> AggregationOutput {
        AggregationOutput::Totals(GroupSummary {
            driver_count,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = ResultCache::default();
        let computed = AtomicU32::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_compute("k".to_string(), async {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok(totals(7))
                })
                .await
                .unwrap();
            assert!(matches!(*result, AggregationOutput::Totals(ref s) if s.driver_count == 7));
        }

        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResultCache::default();

        let err = cache
            .get_or_compute("k".to_string(), async {
                Err(EngineError::Source("boom".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Source("boom".into()));

        // The key is still free; a later computation succeeds and caches.
        let result = cache
            .get_or_compute("k".to_string(), async { Ok(totals(1)) })
            .await
            .unwrap();
        assert!(matches!(*result, AggregationOutput::Totals(_)));
        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn concurrent_misses_compute_once() {
        let cache = Arc::new(ResultCache::default());
        let computed = Arc::new(AtomicU32::new(0));

        let lookup = |cache: Arc<ResultCache>, computed: Arc<AtomicU32>| async move {
            cache
                .get_or_compute("k".to_string(), async move {
                    computed.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(totals(3))
                })
                .await
                .unwrap()
        };

        let (a, b) = tokio::join!(
            lookup(cache.clone(), computed.clone()),
            lookup(cache.clone(), computed.clone())
        );

        assert_eq!(*a, *b);
        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }
}
