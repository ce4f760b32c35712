//! Per-source circuit breaker.
//!
//! Tracks consecutive failures per source and temporarily stops querying
//! sources that fail repeatedly. After a cooldown the circuit becomes
//! half-open: exactly one query is let through as a probe, and its outcome
//! either closes the circuit or trips it again. Other queries keep skipping
//! the source while the probe is in flight.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure             │
//!     └─────────────────────────┴──────────────────────┘
//! ```
//!
//! A skipped source is reported as `unavailable` in the aggregated response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::GatewayError;

/// Circuit state for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Healthy; queries go through.
    Closed,
    /// Tripped; queries are skipped until the cooldown expires.
    Open,
    /// Cooldown elapsed; a single probe query is allowed.
    HalfOpen,
}

/// Health tracking for one source.
#[derive(Debug, Clone)]
struct SourceHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// When false, every source is always attempted.
    pub enabled: bool,
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds to stay open before allowing a probe.
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.enabled && self.failure_threshold == 0 {
            return Err(GatewayError::Config(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Per-source circuit breaker. Source ids are matched case-insensitively.
pub struct CircuitBreaker {
    config: BreakerConfig,
    sources: HashMap<String, SourceHealth>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("sources", &self.sources)
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker using the system clock.
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a breaker that reads time from `clock`.
    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            sources: HashMap::new(),
            clock,
        }
    }

    fn health(&mut self, source: &str) -> &mut SourceHealth {
        self.sources.entry(source.to_lowercase()).or_default()
    }

    /// Record a successful query. Closes the circuit.
    pub fn record_success(&mut self, source: &str) {
        let health = self.health(source);
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
        health.probe_in_flight = false;
    }

    /// Record a failed query. Opens the circuit at the threshold, or
    /// immediately when a half-open probe fails.
    pub fn record_failure(&mut self, source: &str) {
        let now = self.clock.now();
        let threshold = self.config.failure_threshold;
        let health = self.health(source);
        health.consecutive_failures += 1;
        health.last_failure_at = Some(now);
        health.probe_in_flight = false;

        if health.state == CircuitState::HalfOpen || health.consecutive_failures >= threshold {
            if health.state != CircuitState::Open {
                tracing::warn!(
                    source,
                    failures = health.consecutive_failures,
                    "circuit opened"
                );
            }
            health.state = CircuitState::Open;
        }
    }

    /// Whether `source` should be queried now.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// lets this one query through as the probe. Further queries are refused
    /// until the probe is recorded or released.
    pub fn should_attempt(&mut self, source: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let now = self.clock.now();
        let cooldown = self.config.cooldown();
        let health = self.health(source);

        match health.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if health.probe_in_flight {
                    return false;
                }
                health.probe_in_flight = true;
                true
            }
            CircuitState::Open => {
                let cooled = health
                    .last_failure_at
                    .is_none_or(|t| now.saturating_duration_since(t) >= cooldown);
                if cooled {
                    tracing::debug!(source, "circuit half-open, probing");
                    health.state = CircuitState::HalfOpen;
                    health.probe_in_flight = true;
                }
                cooled
            }
        }
    }

    /// Give back a probe slot granted by [`should_attempt`](Self::should_attempt)
    /// for a query that never reached the source.
    pub fn release_probe(&mut self, source: &str) {
        if let Some(health) = self.sources.get_mut(&source.to_lowercase()) {
            health.probe_in_flight = false;
        }
    }

    /// Current state for `source`; unseen sources are closed.
    pub fn state(&self, source: &str) -> CircuitState {
        self.sources
            .get(&source.to_lowercase())
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// `(source, state, consecutive_failures)` for every tracked source.
    pub fn health_report(&self) -> Vec<(String, CircuitState, u32)> {
        let mut report: Vec<_> = self
            .sources
            .iter()
            .map(|(id, h)| (id.clone(), h.state, h.consecutive_failures))
            .collect();
        report.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}
