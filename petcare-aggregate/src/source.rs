//! Trait definition for pluggable upstream providers.
//!
//! Each provider (drug registries, outbreak feeds, portal-only agencies)
//! implements [`SourceClient`] to give the coordinator a uniform way to
//! query it and a uniform shape for what comes back.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{Query, SourceDescriptor, SourceErrorKind, SourceOutcome};

/// An upstream data provider.
///
/// Implementors handle their own URL construction, request, payload
/// normalization and error classification. Ordinary failures (network
/// errors, non-2xx responses, timeouts, malformed payloads) are returned as
/// [`SourceOutcome::Failure`], never as panics or errors.
///
/// All implementations must be `Send + Sync` so they can be queried from
/// concurrent tasks.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Static metadata for this provider.
    fn descriptor(&self) -> &SourceDescriptor;

    /// Query the provider within `budget`.
    async fn fetch(&self, query: &Query, budget: Duration) -> SourceOutcome;

    /// Shorthand for `descriptor().id`.
    fn id(&self) -> &str {
        &self.descriptor().id
    }
}

/// Invoke `client` and hard-bound the call by `budget`.
///
/// Adapters are expected to honour the budget themselves; this wrapper
/// converts any overrun into a `timeout` failure so a misbehaving adapter
/// cannot hold up the caller.
pub async fn fetch_within(
    client: &dyn SourceClient,
    query: &Query,
    budget: Duration,
) -> SourceOutcome {
    match tokio::time::timeout(budget, client.fetch(query, budget)).await {
        Ok(outcome) => outcome,
        Err(_) => SourceOutcome::failure(
            client.id(),
            SourceErrorKind::Timeout,
            format!("no answer within {} ms", budget.as_millis()),
        ),
    }
}
