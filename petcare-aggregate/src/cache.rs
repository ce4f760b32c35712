//! In-memory TTL cache for aggregated responses.
//!
//! Entries are keyed by [`QueryFingerprint`]. Logical validity is decided
//! against the injected [`Clock`]: an entry is served only while
//! `now < created_at + ttl`, and an expired entry found on lookup is
//! invalidated on the spot. [`moka`] provides the concurrent storage, the
//! size bound and physical reclamation of expired rows.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

use crate::clock::{Clock, SystemClock};
use crate::fingerprint::QueryFingerprint;
use crate::types::AggregatedResponse;

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// Longest TTL the store accepts; longer TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A cached response with its creation instant and time-to-live.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored response (with `cached = false`).
    pub response: AggregatedResponse,
    /// When the entry was written, according to the store's clock.
    pub created_at: Instant,
    /// How long the entry stays valid.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry is still valid at `now`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.created_at
            .checked_add(self.ttl)
            .is_none_or(|expires_at| now < expires_at)
    }
}

/// Physical expiry: moka drops a row once its own TTL has elapsed.
struct EntryExpiry;

impl Expiry<QueryFingerprint, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &QueryFingerprint,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &QueryFingerprint,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Fingerprint-keyed response cache with per-entry expiry.
#[derive(Clone)]
pub struct CacheStore {
    entries: Cache<QueryFingerprint, CacheEntry>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("default_ttl", &self.default_ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl CacheStore {
    /// Create a store using the system clock.
    pub fn new(default_ttl: Duration, max_entries: u64) -> Self {
        Self::with_clock(default_ttl, max_entries, Arc::new(SystemClock))
    }

    /// Create a store that reads time from `clock`.
    pub fn with_clock(default_ttl: Duration, max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self {
            entries,
            default_ttl: default_ttl.min(MAX_TTL),
            clock,
        }
    }

    /// The TTL applied by [`put`](Self::put).
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a response. Expired entries behave as absent and are evicted.
    pub async fn get(&self, fingerprint: &QueryFingerprint) -> Option<AggregatedResponse> {
        let entry = self.entries.get(fingerprint).await?;
        if entry.is_fresh(self.clock.now()) {
            return Some(entry.response);
        }
        tracing::trace!(%fingerprint, "evicting expired cache entry");
        self.entries.invalidate(fingerprint).await;
        None
    }

    /// Store a response with the default TTL, overwriting any existing entry.
    pub async fn put(&self, fingerprint: QueryFingerprint, response: AggregatedResponse) {
        self.put_with_ttl(fingerprint, response, self.default_ttl).await;
    }

    /// Store a response with an explicit TTL, overwriting any existing entry.
    pub async fn put_with_ttl(
        &self,
        fingerprint: QueryFingerprint,
        mut response: AggregatedResponse,
        ttl: Duration,
    ) {
        response.cached = false;
        let entry = CacheEntry {
            response,
            created_at: self.clock.now(),
            ttl: ttl.min(MAX_TTL),
        };
        self.entries.insert(fingerprint, entry).await;
    }

    /// Number of physically stored entries (may include expired rows not yet reclaimed).
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
