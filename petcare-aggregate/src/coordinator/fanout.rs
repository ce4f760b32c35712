//! Concurrent fan-out under a global deadline.
//!
//! One task per selected source, gated by a semaphore of `max_parallel`
//! permits. Every task gets `min(source_timeout, time left)` as its budget.
//! At the deadline, tasks still running are aborted and reported as
//! `timeout`; anything they produce afterwards is dropped with the task.
//!
//! Only sources whose `fetch` actually started feed the circuit breaker.
//! A source still queued for a permit at the deadline is reported as
//! `timeout` but its circuit is left alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::AggregatorConfig;
use crate::registry::SourceRegistry;
use crate::source::fetch_within;
use crate::types::{Query, SourceErrorKind, SourceOutcome};

/// How far a source got, which decides what the breaker learns.
#[derive(Clone, Copy)]
enum Reach {
    /// Never spawned: unregistered or circuit open.
    Skipped,
    /// Spawned but `fetch` never began.
    Queued,
    /// `fetch` was invoked.
    Invoked,
}

/// A source either settled before launch or running as a task.
enum Slot {
    Ready(SourceOutcome),
    Running {
        id: String,
        started: Arc<AtomicBool>,
        handle: tokio::task::JoinHandle<SourceOutcome>,
    },
}

/// Query every source in `query.sources` and return one outcome per source,
/// in request order.
pub async fn fan_out(
    registry: &SourceRegistry,
    query: &Query,
    config: &AggregatorConfig,
    breaker: &Mutex<CircuitBreaker>,
) -> Vec<SourceOutcome> {
    let deadline = Instant::now() + config.deadline();
    let source_timeout = config.source_timeout();
    let permits = Arc::new(Semaphore::new(config.max_parallel.max(1)));
    let shared = Arc::new(query.clone());

    let mut slots = Vec::with_capacity(query.sources.len());
    for id in &query.sources {
        let Some(source) = registry.get(id).cloned() else {
            slots.push(Slot::Ready(SourceOutcome::failure(
                id.as_str(),
                SourceErrorKind::Unavailable,
                "source not registered",
            )));
            continue;
        };

        let allowed = breaker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .should_attempt(source.id());
        if !allowed {
            tracing::debug!(source = source.id(), "circuit open, skipping source");
            slots.push(Slot::Ready(SourceOutcome::failure(
                source.id(),
                SourceErrorKind::Unavailable,
                "circuit open",
            )));
            continue;
        }

        let source_id = source.id().to_owned();
        let started = Arc::new(AtomicBool::new(false));
        let task_started = Arc::clone(&started);
        let permits = Arc::clone(&permits);
        let query = Arc::clone(&shared);
        let handle = tokio::spawn(async move {
            let id = source.id().to_owned();
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return SourceOutcome::failure(
                        id,
                        SourceErrorKind::Unavailable,
                        "fan-out closed",
                    );
                }
            };

            let budget = source_timeout.min(deadline.saturating_duration_since(Instant::now()));
            if budget.is_zero() {
                return SourceOutcome::failure(
                    id,
                    SourceErrorKind::Timeout,
                    "global deadline reached before start",
                );
            }

            task_started.store(true, Ordering::SeqCst);
            let begun = Instant::now();
            let outcome = fetch_within(source.as_ref(), &query, budget).await;
            tracing::debug!(
                source = id.as_str(),
                ok = outcome.is_success(),
                elapsed_ms = begun.elapsed().as_millis() as u64,
                "source finished"
            );
            outcome
        });
        slots.push(Slot::Running {
            id: source_id,
            started,
            handle,
        });
    }

    let waits = slots.into_iter().map(|slot| async move {
        match slot {
            Slot::Ready(outcome) => (outcome, Reach::Skipped),
            Slot::Running {
                id,
                started,
                handle,
            } => {
                let abort = handle.abort_handle();
                let outcome = match tokio::time::timeout_at(deadline, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join_error)) => {
                        tracing::error!(source = id.as_str(), error = %join_error, "source task failed");
                        SourceOutcome::failure(id, SourceErrorKind::Unavailable, "source task failed")
                    }
                    Err(_) => {
                        abort.abort();
                        tracing::warn!(source = id.as_str(), "source cut off at global deadline");
                        SourceOutcome::failure(
                            id,
                            SourceErrorKind::Timeout,
                            "global deadline exceeded",
                        )
                    }
                };
                let reach = if started.load(Ordering::SeqCst) {
                    Reach::Invoked
                } else {
                    Reach::Queued
                };
                (outcome, reach)
            }
        }
    });
    let settled = futures::future::join_all(waits).await;

    let mut guard = breaker.lock().unwrap_or_else(|e| e.into_inner());
    settled
        .into_iter()
        .map(|(outcome, reach)| {
            match reach {
                Reach::Invoked if outcome.is_success() => {
                    guard.record_success(outcome.source_id());
                }
                Reach::Invoked => guard.record_failure(outcome.source_id()),
                Reach::Queued => guard.release_probe(outcome.source_id()),
                Reach::Skipped => {}
            }
            outcome
        })
        .collect()
}
