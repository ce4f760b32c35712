//! Aggregation configuration with sensible defaults.
//!
//! [`AggregatorConfig`] controls the fan-out deadline, per-source budgets,
//! parallelism, cache behaviour and query limits. [`SourceSpec`] describes
//! one upstream provider to register.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GatewayError;

/// Configuration for query validation, fan-out and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Wall-clock deadline for the whole fan-out, in milliseconds.
    pub deadline_ms: u64,
    /// Maximum time budget for a single source, in milliseconds.
    pub source_timeout_ms: u64,
    /// Maximum number of sources queried at the same time.
    pub max_parallel: usize,
    /// Default cache time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Upper bound on cached responses.
    pub cache_max_entries: u64,
    /// Limit applied when the caller does not pass one.
    pub default_limit: usize,
    /// Hard cap on the limit, enforced server-side.
    pub max_limit: usize,
    /// Minimum length of the free-text term, in characters.
    pub min_term_len: usize,
    /// Whether a term is mandatory. When false, filters alone are accepted.
    pub require_term: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 15_000,
            source_timeout_ms: 10_000,
            max_parallel: 3,
            cache_ttl_secs: 3_600,
            cache_max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            default_limit: 20,
            max_limit: 100,
            min_term_len: 2,
            require_term: true,
        }
    }
}

impl AggregatorConfig {
    /// The global fan-out deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// The per-source time budget.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// The default cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `deadline_ms`, `source_timeout_ms`, `max_parallel` and `cache_max_entries` are non-zero
    /// - `cache_ttl_secs` does not exceed [`MAX_TTL`](crate::cache::MAX_TTL)
    /// - `default_limit` is between 1 and `max_limit`
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.deadline_ms == 0 {
            return Err(GatewayError::Config(
                "deadline_ms must be greater than 0".into(),
            ));
        }
        if self.source_timeout_ms == 0 {
            return Err(GatewayError::Config(
                "source_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(GatewayError::Config(
                "max_parallel must be greater than 0".into(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(GatewayError::Config(
                "cache_max_entries must be greater than 0".into(),
            ));
        }
        if self.cache_ttl_secs > crate::cache::MAX_TTL.as_secs() {
            return Err(GatewayError::Config(format!(
                "cache_ttl_secs must be at most {}",
                crate::cache::MAX_TTL.as_secs()
            )));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(GatewayError::Config(
                "default_limit must be between 1 and max_limit".into(),
            ));
        }
        Ok(())
    }
}

/// Which adapter implements a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Polish medicinal products registry JSON API.
    Urpl,
    /// openFDA animal & veterinary events API.
    Openfda,
    /// Animal disease event feed.
    Wahis,
    /// Provider without a public API; answers with a portal pointer.
    Portal,
    /// Built-in reference formulary.
    Formulary,
}

/// One upstream provider to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source id used in selectors.
    pub id: String,
    /// Adapter implementing the source.
    pub kind: SourceKind,
    /// Display name. Defaults to the id.
    #[serde(default)]
    pub name: String,
    /// Primary API base address, or the portal address for portal sources.
    #[serde(default)]
    pub base_url: String,
    /// Secondary base address tried when the primary fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Jurisdiction served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Informational note returned by portal sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Disabled sources are treated as not configured and never registered.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SourceSpec {
    /// Create an enabled spec with the given id, kind and base address.
    pub fn new(id: impl Into<String>, kind: SourceKind, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: String::new(),
            base_url: base_url.into(),
            fallback_url: None,
            description: String::new(),
            country: None,
            note: None,
            enabled: true,
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the jurisdiction.
    pub fn in_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the portal note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Set the secondary endpoint.
    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }

    /// The display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Validates this spec.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(GatewayError::Config("source id must not be empty".into()));
        }
        if id.eq_ignore_ascii_case("all") || id.contains(',') {
            return Err(GatewayError::Config(format!(
                "source id {id:?} is reserved or contains a comma"
            )));
        }
        let needs_url = !matches!(self.kind, SourceKind::Formulary);
        if needs_url && self.base_url.trim().is_empty() {
            return Err(GatewayError::Config(format!(
                "source {id} requires a base_url"
            )));
        }
        Ok(())
    }
}
