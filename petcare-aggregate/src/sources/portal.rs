//! Providers without a public query API.
//!
//! The source always answers successfully with no records and a note
//! pointing the caller at the provider's own portal.

use std::time::Duration;

use async_trait::async_trait;

use crate::source::SourceClient;
use crate::types::{Query, SourceDescriptor, SourceOutcome};

/// A source that answers with a pointer instead of records.
pub struct PortalSource {
    descriptor: SourceDescriptor,
    note: String,
}

impl PortalSource {
    /// Create a portal source. Without an explicit note, one is derived from the descriptor.
    pub fn new(descriptor: SourceDescriptor, note: Option<String>) -> Self {
        let note = note.unwrap_or_else(|| {
            format!(
                "{} has no public query API; search it directly at {}",
                descriptor.name, descriptor.url
            )
        });
        Self { descriptor, note }
    }
}

#[async_trait]
impl SourceClient for PortalSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _query: &Query, _budget: Duration) -> SourceOutcome {
        SourceOutcome::note(&self.descriptor.id, &self.note)
    }
}
