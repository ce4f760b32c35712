//! Core types: queries, normalized records, source metadata and outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized lookup query.
///
/// Produced by [`crate::router::QueryRouter`] from a raw
/// [`QueryRequest`]: the term is trimmed, filter keys are lowercased,
/// the source selector is resolved to concrete ids (in request order) and
/// the limit is clamped to the server-side cap. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text search term, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Additional filters (`country`, `category`, `species`, ...).
    /// Keys are always lowercase.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
    /// Resolved source ids, in the order they were requested.
    pub sources: Vec<String>,
    /// Effective result limit.
    pub limit: usize,
}

impl Query {
    /// Create a query for `term` with no filters, no sources and a limit of 20.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            filters: BTreeMap::new(),
            sources: Vec::new(),
            limit: 20,
        }
    }

    /// Add a filter. The key is lowercased and the value trimmed.
    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        self.filters
            .insert(key.trim().to_lowercase(), value.trim().to_owned());
        self
    }

    /// Set the resolved source ids.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Set the effective limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The term, or an empty string when absent.
    pub fn term_or_empty(&self) -> &str {
        self.term.as_deref().unwrap_or("")
    }

    /// Look up a filter value by case-insensitive key.
    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(&key.to_lowercase()).map(String::as_str)
    }
}

/// A raw lookup request as received from a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Free-text term as supplied.
    pub term: Option<String>,
    /// Filters as supplied (any key casing).
    pub filters: Vec<(String, String)>,
    /// Source selector: `all`, or a comma-separated list of ids. `None` means `all`.
    pub source: Option<String>,
    /// Raw limit parameter.
    pub limit: Option<String>,
}

impl QueryRequest {
    /// Build a request from flat key/value parameters.
    ///
    /// `term` (alias `q`), `source` and `limit` are recognised; every other
    /// non-empty parameter becomes a filter.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in params {
            let value = value.into();
            match key.as_ref().to_lowercase().as_str() {
                "term" | "q" => request.term = Some(value),
                "source" => request.source = Some(value),
                "limit" => request.limit = Some(value),
                other => {
                    if !value.trim().is_empty() {
                        request.filters.push((other.to_owned(), value));
                    }
                }
            }
        }
        request
    }
}

/// The canonical kind of record a source returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Veterinary medicinal products.
    Drug,
    /// Animal disease outbreak events.
    Alert,
    /// Pointers to external portals (no records).
    Reference,
}

/// Static registration metadata for one upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// Stable identifier used in source selectors (matched case-insensitively).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base address of the API, or the public portal for non-live sources.
    pub url: String,
    /// Whether the provider answers live queries.
    pub supports_live_query: bool,
    /// Canonical kind of record this provider returns.
    pub result_kind: ResultKind,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Jurisdiction served by the provider (`PL`, `US`, `EU`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A record normalized from a provider-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Provider-scoped identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category or classification (ATC code, disease, drug class).
    pub category: String,
    /// Provenance: the id of the source that produced this record.
    pub source: String,
    /// Unmapped provider fields, passed through opaquely.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Create a record with empty metadata.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            source: source.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata field, skipping empty strings and nulls.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        let empty = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !empty {
            self.metadata.insert(key.to_owned(), value);
        }
        self
    }
}

/// Why a single source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// The source did not answer within its budget or the global deadline.
    Timeout,
    /// The source answered with an error status.
    UpstreamError,
    /// The source could not be reached, or its circuit is open.
    Unavailable,
    /// The source answered but the payload could not be understood.
    ParseError,
}

impl SourceErrorKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::UpstreamError => "upstream_error",
            Self::Unavailable => "unavailable",
            Self::ParseError => "parse_error",
        }
    }

    /// Whether trying an alternative endpoint may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamError | Self::Unavailable)
    }
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// Id of the failing source.
    pub source: String,
    /// Failure classification.
    pub kind: SourceErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// The result of invoking one source: records or a failure, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// The source answered. `records` may be empty.
    Records {
        /// Id of the answering source.
        source: String,
        /// Normalized records in provider order.
        records: Vec<Record>,
        /// Informational note (portal pointers and the like).
        note: Option<String>,
    },
    /// The source failed.
    Failure(SourceFailure),
}

impl SourceOutcome {
    /// A successful outcome with records and no note.
    pub fn records(source: impl Into<String>, records: Vec<Record>) -> Self {
        Self::Records {
            source: source.into(),
            records,
            note: None,
        }
    }

    /// A successful outcome with no records and an informational note.
    pub fn note(source: impl Into<String>, note: impl Into<String>) -> Self {
        Self::Records {
            source: source.into(),
            records: Vec::new(),
            note: Some(note.into()),
        }
    }

    /// A failed outcome.
    pub fn failure(
        source: impl Into<String>,
        kind: SourceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Failure(SourceFailure {
            source: source.into(),
            kind,
            message: message.into(),
        })
    }

    /// Id of the source that produced this outcome.
    pub fn source_id(&self) -> &str {
        match self {
            Self::Records { source, .. } => source,
            Self::Failure(failure) => &failure.source,
        }
    }

    /// Whether the source answered.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Records { .. })
    }

    /// The failure kind, if this outcome is a failure.
    pub fn error_kind(&self) -> Option<SourceErrorKind> {
        match self {
            Self::Records { .. } => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Per-source summary included in every aggregated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Source id.
    pub id: String,
    /// Source display name.
    pub name: String,
    /// Source address or portal.
    pub url: String,
    /// Number of records the source contributed before truncation.
    pub count: usize,
    /// Failure kind, `null` when the source answered.
    pub error: Option<SourceErrorKind>,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Informational note from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// How degraded an aggregated response is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// Every selected source answered.
    Complete,
    /// Some sources failed, at least one answered.
    Partial,
    /// Every selected source failed.
    AllSourcesFailed,
}

/// The merged result of one fan-out, as cached and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    /// Echo of the normalized query.
    pub query: Query,
    /// Per-source status, in request order.
    pub sources: Vec<SourceStatus>,
    /// Merged records: source order, then provider order; truncated at the limit.
    pub results: Vec<Record>,
    /// Number of records in `results`.
    pub total: usize,
    /// Whether this response was served from cache.
    pub cached: bool,
}

impl AggregatedResponse {
    /// Classify how many of the selected sources failed.
    pub fn degradation(&self) -> Degradation {
        let failed = self.failed_sources().count();
        if failed == 0 {
            Degradation::Complete
        } else if failed == self.sources.len() {
            Degradation::AllSourcesFailed
        } else {
            Degradation::Partial
        }
    }

    /// Statuses of the sources that failed.
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceStatus> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}
