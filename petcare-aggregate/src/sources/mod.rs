//! Concrete [`SourceClient`] adapters.
//!
//! | Kind | Adapter | Records |
//! |------|---------|---------|
//! | `urpl` | [`UrplSource`] | drugs |
//! | `openfda` | [`OpenFdaSource`] | drugs |
//! | `wahis` | [`WahisSource`] | outbreak alerts |
//! | `portal` | [`PortalSource`] | none, a pointer note |
//! | `formulary` | [`FormularySource`] | drugs, from memory |

pub mod failover;
pub mod formulary;
pub mod openfda;
pub mod portal;
pub mod urpl;
pub mod wahis;

use std::sync::Arc;

pub use failover::FailoverSource;
pub use formulary::FormularySource;
pub use openfda::OpenFdaSource;
pub use portal::PortalSource;
pub use urpl::UrplSource;
pub use wahis::WahisSource;

use crate::config::{SourceKind, SourceSpec};
use crate::error::GatewayError;
use crate::source::SourceClient;
use crate::types::{ResultKind, SourceDescriptor};

/// Build the descriptor advertised for `spec`, pointing at `url`.
pub fn descriptor_for(spec: &SourceSpec, url: &str) -> SourceDescriptor {
    let (supports_live_query, result_kind) = match spec.kind {
        SourceKind::Urpl | SourceKind::Openfda | SourceKind::Formulary => (true, ResultKind::Drug),
        SourceKind::Wahis => (true, ResultKind::Alert),
        SourceKind::Portal => (false, ResultKind::Reference),
    };
    SourceDescriptor {
        id: spec.id.trim().to_owned(),
        name: spec.display_name().to_owned(),
        url: url.to_owned(),
        supports_live_query,
        result_kind,
        description: spec.description.clone(),
        country: spec.country.clone(),
    }
}

fn adapter(
    spec: &SourceSpec,
    base_url: &str,
    client: &reqwest::Client,
) -> Result<Arc<dyn SourceClient>, GatewayError> {
    let descriptor = descriptor_for(spec, base_url);
    let source: Arc<dyn SourceClient> = match spec.kind {
        SourceKind::Urpl => Arc::new(UrplSource::new(descriptor, client.clone(), base_url)?),
        SourceKind::Openfda => Arc::new(OpenFdaSource::new(descriptor, client.clone(), base_url)?),
        SourceKind::Wahis => Arc::new(WahisSource::new(descriptor, client.clone(), base_url)?),
        SourceKind::Portal => Arc::new(PortalSource::new(descriptor, spec.note.clone())),
        SourceKind::Formulary => Arc::new(FormularySource::new(descriptor)),
    };
    Ok(source)
}

/// Build the client for `spec`, wrapping it in a [`FailoverSource`] when a
/// secondary endpoint is configured for a network-backed kind.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the spec is invalid or an address
/// cannot be parsed.
pub fn build(
    spec: &SourceSpec,
    client: &reqwest::Client,
) -> Result<Arc<dyn SourceClient>, GatewayError> {
    spec.validate()?;
    let primary = adapter(spec, spec.base_url.trim(), client)?;

    let networked = matches!(
        spec.kind,
        SourceKind::Urpl | SourceKind::Openfda | SourceKind::Wahis
    );
    match spec.fallback_url.as_deref().map(str::trim) {
        Some(url) if networked && !url.is_empty() => {
            let secondary = adapter(spec, url, client)?;
            Ok(Arc::new(FailoverSource::new(primary, secondary)))
        }
        Some(url) if !url.is_empty() => {
            tracing::debug!(source = spec.id.as_str(), "fallback_url ignored for offline source");
            Ok(primary)
        }
        _ => Ok(primary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> reqwest::Client {
        crate::http::build_client(Duration::from_secs(1)).expect("client")
    }

    #[test]
    fn descriptor_reflects_kind() {
        let spec = SourceSpec::new("ema", SourceKind::Portal, "https://ema.test").named("EMA");
        let d = descriptor_for(&spec, "https://ema.test");
        assert!(!d.supports_live_query);
        assert_eq!(d.result_kind, ResultKind::Reference);
        assert_eq!(d.name, "EMA");

        let spec = SourceSpec::new("woah", SourceKind::Wahis, "https://woah.test");
        assert_eq!(descriptor_for(&spec, "").result_kind, ResultKind::Alert);
        assert_eq!(descriptor_for(&spec, "").name, "woah");
    }

    #[test]
    fn build_every_kind() {
        let specs = [
            SourceSpec::new("urpl", SourceKind::Urpl, "https://urpl.test"),
            SourceSpec::new("fda", SourceKind::Openfda, "https://fda.test"),
            SourceSpec::new("woah", SourceKind::Wahis, "https://woah.test"),
            SourceSpec::new("ema", SourceKind::Portal, "https://ema.test"),
            SourceSpec::new("formulary", SourceKind::Formulary, ""),
        ];
        for spec in &specs {
            let source = build(spec, &client()).expect("build");
            assert_eq!(source.id(), spec.id);
        }
    }

    #[test]
    fn build_rejects_invalid_spec() {
        let spec = SourceSpec::new("all", SourceKind::Urpl, "https://urpl.test");
        assert!(build(&spec, &client()).is_err());
        let spec = SourceSpec::new("urpl", SourceKind::Urpl, "not a url");
        assert!(build(&spec, &client()).is_err());
    }

    #[test]
    fn fallback_keeps_primary_descriptor() {
        let spec = SourceSpec::new("urpl", SourceKind::Urpl, "https://primary.test")
            .with_fallback("https://mirror.test");
        let source = build(&spec, &client()).expect("build");
        assert_eq!(source.descriptor().url, "https://primary.test");
    }
}
