//! Query router: validation, source resolution and the cache check.
//!
//! The router is stateless per request. It turns a raw [`QueryRequest`]
//! into a normalized [`Query`], answers from the [`CacheStore`] when it
//! can (flagging the response `cached`), and otherwise hands the query to
//! the [`AggregationCoordinator`].
//!
//! [`CacheStore`]: crate::cache::CacheStore

use std::sync::Arc;

use crate::coordinator::AggregationCoordinator;
use crate::error::{GatewayError, Result};
use crate::fingerprint::QueryFingerprint;
use crate::types::{AggregatedResponse, Query, QueryRequest};

/// Entry point for lookups.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    coordinator: Arc<AggregationCoordinator>,
}

impl QueryRouter {
    pub fn new(coordinator: Arc<AggregationCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &AggregationCoordinator {
        &self.coordinator
    }

    /// Validate `request` and build the normalized query.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidQuery`] for a short term, a missing term when
    ///   one is required, or a limit that is not a positive integer.
    /// - [`GatewayError::UnknownSource`] / [`GatewayError::NoSourcesSelected`]
    ///   from selector resolution.
    pub fn normalize(&self, request: &QueryRequest) -> Result<Query> {
        let config = self.coordinator.config();

        let term = request
            .term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match term {
            Some(t) if t.chars().count() < config.min_term_len => {
                return Err(GatewayError::InvalidQuery(format!(
                    "term must be at least {} characters",
                    config.min_term_len
                )));
            }
            None if config.require_term => {
                return Err(GatewayError::InvalidQuery("term is required".into()));
            }
            _ => {}
        }

        let limit = match request.limit.as_deref().map(str::trim) {
            None | Some("") => config.default_limit,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(GatewayError::InvalidQuery(format!(
                        "limit must be a positive integer, got {raw:?}"
                    )));
                }
                Ok(n) => n.min(config.max_limit),
            },
        };

        let sources = self
            .coordinator
            .registry()
            .resolve(request.source.as_deref())?;

        let mut query = Query {
            term: term.map(str::to_owned),
            ..Query::new("")
        }
        .with_sources(sources)
        .with_limit(limit);
        for (key, value) in &request.filters {
            query = query.with_filter(key, value);
        }
        Ok(query)
    }

    /// Answer `request`, from cache when possible.
    ///
    /// # Errors
    ///
    /// Only caller errors from [`normalize`](Self::normalize). Source
    /// failures are reported inside the response.
    pub async fn handle(&self, request: &QueryRequest) -> Result<AggregatedResponse> {
        let query = self.normalize(request)?;
        Ok(self.lookup(&query).await)
    }

    /// Answer an already normalized query, from cache when possible.
    ///
    /// A cached response echoes this caller's query, not the one that
    /// filled the cache.
    pub async fn lookup(&self, query: &Query) -> AggregatedResponse {
        let fingerprint = QueryFingerprint::of(query);
        if let Some(mut response) = self.coordinator.cache().get(&fingerprint).await {
            tracing::debug!(%fingerprint, "cache hit");
            response.query = query.clone();
            response.cached = true;
            return response;
        }
        tracing::debug!(%fingerprint, term = query.term_or_empty(), "cache miss");
        self.coordinator.aggregate(query).await
    }
}
