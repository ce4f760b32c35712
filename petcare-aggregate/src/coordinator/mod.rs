//! Aggregation coordinator: fan-out, merge and cache write-through.
//!
//! # Pipeline
//!
//! 1. Fingerprint the (already normalized) query
//! 2. Fan out to the selected sources under one global deadline ([`fanout`])
//! 3. Merge outcomes in request order, dedup and truncate ([`merge`])
//! 4. Store the response in the [`CacheStore`] unless every source failed
//!
//! The coordinator never reads the cache: the router has already missed.

pub mod fanout;
pub mod merge;

use std::sync::Mutex;
use std::time::Instant;

use crate::cache::CacheStore;
use crate::circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::config::AggregatorConfig;
use crate::fingerprint::QueryFingerprint;
use crate::registry::SourceRegistry;
use crate::types::{AggregatedResponse, Degradation, Query};

/// Runs fresh aggregations and writes them through to the cache.
#[derive(Debug)]
pub struct AggregationCoordinator {
    registry: SourceRegistry,
    cache: CacheStore,
    config: AggregatorConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl AggregationCoordinator {
    /// Create a coordinator with a default circuit breaker.
    pub fn new(registry: SourceRegistry, cache: CacheStore, config: AggregatorConfig) -> Self {
        Self::with_breaker(
            registry,
            cache,
            config,
            CircuitBreaker::new(BreakerConfig::default()),
        )
    }

    /// Create a coordinator with an explicit circuit breaker.
    pub fn with_breaker(
        registry: SourceRegistry,
        cache: CacheStore,
        config: AggregatorConfig,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            registry,
            cache,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// `(source, state, consecutive_failures)` for every source the breaker
    /// has seen, sorted by id.
    pub fn circuit_health(&self) -> Vec<(String, CircuitState, u32)> {
        self.breaker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .health_report()
    }

    /// Aggregate `query` across its resolved sources.
    ///
    /// Always fetches; never fails. Source failures are reported in the
    /// per-source status list of the returned response.
    pub async fn aggregate(&self, query: &Query) -> AggregatedResponse {
        let fingerprint = QueryFingerprint::of(query);
        let started = Instant::now();

        let outcomes = fanout::fan_out(&self.registry, query, &self.config, &self.breaker).await;
        let response = merge::merge(query, outcomes, |id| {
            self.registry.get(id).map(|source| source.descriptor())
        });

        let degradation = response.degradation();
        tracing::info!(
            %fingerprint,
            sources = response.sources.len(),
            failed = response.failed_sources().count(),
            total = response.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation complete"
        );

        if degradation == Degradation::AllSourcesFailed {
            tracing::warn!(%fingerprint, "all selected sources failed, response not cached");
        } else {
            self.cache.put(fingerprint, response.clone()).await;
        }
        response
    }
}
