//! Deterministic cache keys derived from normalized queries.
//!
//! The fingerprint covers the trimmed, lowercased term, the filter set
//! (keys and values lowercased, sorted by key), the resolved source ids
//! (lowercased and sorted) and the effective limit. Every component is
//! length-prefixed before hashing so that no two distinct parameter sets
//! can produce the same byte stream.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::Query;

/// SHA-256 hex digest identifying a normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Compute the fingerprint of `query`.
    ///
    /// Source order, filter insertion order and filter-key casing do not
    /// affect the result.
    pub fn of(query: &Query) -> Self {
        let mut hasher = Sha256::new();

        update_field(&mut hasher, "term", &query.term_or_empty().trim().to_lowercase());

        let mut filters: Vec<(String, String)> = query
            .filters
            .iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
            .collect();
        filters.sort();
        for (key, value) in &filters {
            update_field(&mut hasher, "filter", key);
            update_field(&mut hasher, "value", value);
        }

        let mut sources: Vec<String> = query.sources.iter().map(|s| s.to_lowercase()).collect();
        sources.sort();
        sources.dedup();
        for source in &sources {
            update_field(&mut hasher, "source", source);
        }

        update_field(&mut hasher, "limit", &query.limit.to_string());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_field(hasher: &mut Sha256, tag: &str, value: &str) {
    hasher.update(tag.as_bytes());
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
