//! PetCare lookup gateway.
//!
//! Serves veterinary drug lookups or animal disease alerts over HTTP by
//! fanning each request out to several public registries and merging the
//! answers. The aggregation itself lives in [`petcare_aggregate`]; this crate
//! adds configuration, deployment profiles and the axum server.
//!
//! # Architecture
//!
//! - **Config**: TOML file plus `PORT` / `PETCARE_PROFILE` overrides ([`GatewayConfig`])
//! - **Profile**: drug or alert defaults, source tables and categories ([`Profile`])
//! - **Server**: `/query`, `/sources`, `/health`, `/stats`, `/categories`, `/alerts/asf` ([`GatewayServer`])

pub mod config;
pub mod error;
pub mod profile;
pub mod server;

pub use config::{GatewayConfig, GatewaySection, ServerConfig};
pub use error::{Result, ServiceError};
pub use profile::{AsfReference, AsfZone, Category, Profile};
pub use server::GatewayServer;

use petcare_aggregate::QueryRouter;

/// Validate `config` and assemble the query router it describes.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn build_router(config: &GatewayConfig) -> Result<QueryRouter> {
    config.validate()?;
    let router = petcare_aggregate::build_router(
        &config.effective_sources(),
        config.aggregator(),
        config.breaker.clone(),
    )?;
    Ok(router)
}

/// Build the router and start serving on the configured address.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener cannot bind.
pub async fn start(config: &GatewayConfig) -> Result<GatewayServer> {
    let router = build_router(config)?;
    GatewayServer::start(router, config.profile(), &config.server.host, config.port()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn build_router_uses_profile_sources() {
        let router = build_router(&GatewayConfig::default()).unwrap();
        assert_eq!(
            router.coordinator().registry().ids(),
            vec!["urpl", "fda", "ema", "giw", "formulary"]
        );
        assert!(router.coordinator().config().require_term);
    }

    #[test]
    fn build_router_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.gateway.max_parallel = Some(0);
        assert!(matches!(
            build_router(&config),
            Err(ServiceError::Aggregate(_))
        ));
    }
}
