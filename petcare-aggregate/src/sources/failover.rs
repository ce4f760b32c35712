//! Primary/secondary endpoint failover.
//!
//! Wraps two clients for the same provider (for example a registry's main
//! API and its mirror). When the primary fails with a retryable error
//! (`upstream_error`, `unavailable`) the query is repeated against the
//! secondary with whatever budget remains. Timeouts and parse errors are
//! returned as-is.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::source::{SourceClient, fetch_within};
use crate::types::{Query, SourceDescriptor, SourceOutcome};

/// A source that retries a secondary endpoint on retryable failures.
pub struct FailoverSource {
    primary: Arc<dyn SourceClient>,
    secondary: Arc<dyn SourceClient>,
    /// Count of secondary activations.
    failover_count: AtomicU32,
}

impl FailoverSource {
    /// Create a failover pair. Outcomes are reported under the primary's id.
    pub fn new(primary: Arc<dyn SourceClient>, secondary: Arc<dyn SourceClient>) -> Self {
        Self {
            primary,
            secondary,
            failover_count: AtomicU32::new(0),
        }
    }

    /// Number of times the secondary endpoint has been used.
    pub fn failover_count(&self) -> u32 {
        self.failover_count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for FailoverSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverSource")
            .field("primary", &self.primary.descriptor().url)
            .field("secondary", &self.secondary.descriptor().url)
            .field("failover_count", &self.failover_count())
            .finish()
    }
}

/// Re-tag an outcome with `id`.
fn retag(outcome: SourceOutcome, id: &str) -> SourceOutcome {
    match outcome {
        SourceOutcome::Records {
            records, note, ..
        } => SourceOutcome::Records {
            source: id.to_owned(),
            records: records
                .into_iter()
                .map(|mut r| {
                    r.source = id.to_owned();
                    r
                })
                .collect(),
            note,
        },
        SourceOutcome::Failure(mut failure) => {
            failure.source = id.to_owned();
            SourceOutcome::Failure(failure)
        }
    }
}

#[async_trait]
impl SourceClient for FailoverSource {
    fn descriptor(&self) -> &SourceDescriptor {
        self.primary.descriptor()
    }

    async fn fetch(&self, query: &Query, budget: Duration) -> SourceOutcome {
        let started = Instant::now();
        let outcome = self.primary.fetch(query, budget).await;

        let failure = match outcome {
            SourceOutcome::Failure(failure) if failure.kind.is_retryable() => failure,
            other => return other,
        };

        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return SourceOutcome::Failure(failure);
        }

        self.failover_count.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            source = self.id(),
            kind = %failure.kind,
            error = failure.message.as_str(),
            remaining_ms = remaining.as_millis() as u64,
            "primary endpoint failed, trying secondary"
        );
        retag(
            fetch_within(self.secondary.as_ref(), query, remaining).await,
            self.id(),
        )
    }
}
