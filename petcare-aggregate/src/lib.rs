//! # petcare-aggregate
//!
//! Multi-source lookup aggregation for the PetCare gateway.
//!
//! A lookup is fanned out concurrently to several independent upstream
//! providers (drug registries, outbreak feeds, portal-only agencies), the
//! answers that arrive in time are merged, and the merged response is cached
//! so that a repeated lookup does not fan out again.
//!
//! ## Design
//!
//! - Every provider implements [`SourceClient`]; failures are values, not errors
//! - One task per source, a semaphore cap and a single global deadline
//! - Partial success is success: failed sources appear in the per-source status list
//! - Responses are cached by [`QueryFingerprint`] with a per-entry TTL
//! - A per-source circuit breaker skips providers that keep failing
//!
//! ## Security
//!
//! - No network listeners; this is a library, the gateway binary serves HTTP
//! - Query terms are logged only at debug/trace level

pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod registry;
pub mod router;
pub mod source;
pub mod sources;
pub mod types;

use std::sync::Arc;

pub use cache::CacheStore;
pub use circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AggregatorConfig, SourceKind, SourceSpec};
pub use coordinator::AggregationCoordinator;
pub use error::{GatewayError, Result};
pub use fingerprint::QueryFingerprint;
pub use registry::SourceRegistry;
pub use router::QueryRouter;
pub use source::SourceClient;
pub use types::{
    AggregatedResponse, Degradation, Query, QueryRequest, Record, ResultKind, SourceDescriptor,
    SourceErrorKind, SourceOutcome, SourceStatus,
};

/// Assemble a ready-to-use [`QueryRouter`] from configuration.
///
/// Builds one shared HTTP client, registers every enabled source in order,
/// and wires the cache, circuit breaker and coordinator together.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the configuration or any source spec
/// is invalid.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> petcare_aggregate::Result<()> {
/// use petcare_aggregate::{AggregatorConfig, BreakerConfig, QueryRequest, SourceKind, SourceSpec};
///
/// let specs = [SourceSpec::new("formulary", SourceKind::Formulary, "")];
/// let router = petcare_aggregate::build_router(
///     &specs,
///     AggregatorConfig::default(),
///     BreakerConfig::default(),
/// )?;
/// let response = router
///     .handle(&QueryRequest::from_params([("term", "meloxicam")]))
///     .await?;
/// println!("{} results", response.total);
/// # Ok(())
/// # }
/// ```
pub fn build_router(
    specs: &[SourceSpec],
    config: AggregatorConfig,
    breaker: BreakerConfig,
) -> Result<QueryRouter> {
    config.validate()?;
    breaker.validate()?;

    let client = http::build_client(config.source_timeout())?;
    let registry = SourceRegistry::from_specs(specs, &client)?;
    let cache = CacheStore::new(config.cache_ttl(), config.cache_max_entries);
    tracing::info!(
        sources = registry.len(),
        live = registry.live_count(),
        deadline_ms = config.deadline_ms,
        max_parallel = config.max_parallel,
        "aggregator ready"
    );

    let coordinator =
        AggregationCoordinator::with_breaker(registry, cache, config, CircuitBreaker::new(breaker));
    Ok(QueryRouter::new(Arc::new(coordinator)))
}
