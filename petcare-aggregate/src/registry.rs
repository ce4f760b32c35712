//! Ordered set of configured sources.
//!
//! Registration order is the order `all` expands to. Lookups are
//! case-insensitive. Disabled specs are skipped at build time, so a
//! disabled source is indistinguishable from one never configured.

use std::sync::Arc;

use crate::config::SourceSpec;
use crate::error::GatewayError;
use crate::source::SourceClient;
use crate::sources;
use crate::types::SourceDescriptor;

/// Selector that expands to every registered source.
pub const ALL_SOURCES: &str = "all";

/// Registered sources in registration order.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn SourceClient>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.id()))
            .finish()
    }
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from specs, sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an invalid spec or a duplicate id.
    pub fn from_specs(
        specs: &[SourceSpec],
        client: &reqwest::Client,
    ) -> Result<Self, GatewayError> {
        let mut registry = Self::new();
        for spec in specs {
            if !spec.enabled {
                tracing::info!(source = spec.id.as_str(), "source disabled, not registered");
                continue;
            }
            registry.register(sources::build(spec, client)?)?;
        }
        Ok(registry)
    }

    /// Append a source.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a source with the same id (ignoring
    /// case) is already registered.
    pub fn register(&mut self, source: Arc<dyn SourceClient>) -> Result<(), GatewayError> {
        if self.get(source.id()).is_some() {
            return Err(GatewayError::Config(format!(
                "duplicate source id {}",
                source.id()
            )));
        }
        tracing::debug!(source = source.id(), "source registered");
        self.sources.push(source);
        Ok(())
    }

    /// Look up a source by id, ignoring case.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn SourceClient>> {
        let id = id.trim();
        self.sources.iter().find(|s| s.id().eq_ignore_ascii_case(id))
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.sources.iter().map(|s| s.descriptor().clone()).collect()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_owned()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of sources that answer live queries.
    pub fn live_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.descriptor().supports_live_query)
            .count()
    }

    /// Resolve a selector to canonical source ids.
    ///
    /// `None`, blank and `all` (any case) expand to every registered source in
    /// registration order. Otherwise the selector is a comma-separated list of
    /// ids resolved in request order; repeated ids are kept once.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnknownSource`] if any listed id is not registered.
    /// - [`GatewayError::NoSourcesSelected`] if the result is empty.
    pub fn resolve(&self, selector: Option<&str>) -> Result<Vec<String>, GatewayError> {
        let selector = selector.map(str::trim).unwrap_or("");
        let ids = if selector.is_empty() || selector.eq_ignore_ascii_case(ALL_SOURCES) {
            self.ids()
        } else {
            let mut ids: Vec<String> = Vec::new();
            for part in selector.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let source = self
                    .get(part)
                    .ok_or_else(|| GatewayError::UnknownSource(part.to_owned()))?;
                if !ids.iter().any(|id| id == source.id()) {
                    ids.push(source.id().to_owned());
                }
            }
            ids
        };

        if ids.is_empty() {
            return Err(GatewayError::NoSourcesSelected);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use std::time::Duration;

    fn client() -> reqwest::Client {
        crate::http::build_client(Duration::from_secs(1)).expect("client")
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::from_specs(
            &[
                SourceSpec::new("urpl", SourceKind::Urpl, "https://urpl.test"),
                SourceSpec::new("fda", SourceKind::Openfda, "https://fda.test"),
                SourceSpec::new("ema", SourceKind::Portal, "https://ema.test"),
            ],
            &client(),
        )
        .expect("registry")
    }

    #[test]
    fn all_expands_in_registration_order() {
        let registry = registry();
        assert_eq!(registry.resolve(None).expect("ok"), vec!["urpl", "fda", "ema"]);
        assert_eq!(registry.resolve(Some("ALL")).expect("ok"), vec!["urpl", "fda", "ema"]);
        assert_eq!(registry.resolve(Some("  ")).expect("ok"), vec!["urpl", "fda", "ema"]);
    }

    #[test]
    fn list_keeps_request_order_and_drops_repeats() {
        let registry = registry();
        let ids = registry.resolve(Some("EMA, urpl,ema")).expect("ok");
        assert_eq!(ids, vec!["ema", "urpl"]);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let err = registry().resolve(Some("urpl,nope")).unwrap_err();
        assert!(matches!(err, GatewayError::UnknownSource(ref id) if id == "nope"));
    }

    #[test]
    fn only_commas_selects_nothing() {
        let err = registry().resolve(Some(", ,")).unwrap_err();
        assert!(matches!(err, GatewayError::NoSourcesSelected));
    }

    #[test]
    fn empty_registry_selects_nothing() {
        let err = SourceRegistry::new().resolve(None).unwrap_err();
        assert!(matches!(err, GatewayError::NoSourcesSelected));
    }

    #[test]
    fn disabled_specs_are_not_registered() {
        let mut disabled = SourceSpec::new("fda", SourceKind::Openfda, "https://fda.test");
        disabled.enabled = false;
        let registry = SourceRegistry::from_specs(
            &[
                SourceSpec::new("urpl", SourceKind::Urpl, "https://urpl.test"),
                disabled,
            ],
            &client(),
        )
        .expect("registry");
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.resolve(Some("fda")),
            Err(GatewayError::UnknownSource(_))
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = SourceRegistry::from_specs(
            &[
                SourceSpec::new("urpl", SourceKind::Urpl, "https://a.test"),
                SourceSpec::new("URPL", SourceKind::Urpl, "https://b.test"),
            ],
            &client(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn live_count_excludes_portals() {
        assert_eq!(registry().live_count(), 2);
    }
}
