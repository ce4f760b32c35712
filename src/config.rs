//! Gateway configuration.
//!
//! Loaded from a TOML file with four sections:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8010
//!
//! [gateway]
//! profile = "drugs"
//! cache_ttl_secs = 3600
//!
//! [breaker]
//! failure_threshold = 3
//!
//! [[sources]]
//! id = "urpl"
//! kind = "urpl"
//! base_url = "https://pub.rejestrymedyczne.csioz.gov.pl/api/rpl"
//! ```
//!
//! Every field is optional. Unset `[gateway]` values and an empty source
//! list fall back to the defaults of the selected [`Profile`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use petcare_aggregate::{AggregatorConfig, BreakerConfig, SourceSpec};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::profile::Profile;

/// Top-level configuration for the gateway binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub gateway: GatewaySection,
    pub breaker: BreakerConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSpec>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listening port. `None` uses the profile default, `0` auto-assigns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: None,
        }
    }
}

/// Profile selection and per-deployment overrides of the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_entries: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_term_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_term: Option<bool>,
}

impl GatewayConfig {
    /// Defaults for `profile` with no overrides.
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            gateway: GatewaySection {
                profile,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Returns the default config file path: `~/.config/petcare/gateway.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("petcare").join("gateway.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("petcare")
                .join("gateway.toml")
        } else {
            PathBuf::from("/tmp/petcare-config/gateway.toml")
        }
    }

    /// Apply `PORT` and `PETCARE_PROFILE` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an unparseable value.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PETCARE_PROFILE").filter(|v| !v.trim().is_empty()) {
            self.gateway.profile = raw.parse().map_err(ServiceError::Config)?;
        }
        if let Some(raw) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            let port = raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ServiceError::Config(format!("invalid PORT {raw:?}: {e}")))?;
            self.server.port = Some(port);
        }
        Ok(())
    }

    pub fn profile(&self) -> Profile {
        self.gateway.profile
    }

    /// The effective listening port.
    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or_else(|| self.profile().default_port())
    }

    /// Profile defaults with the `[gateway]` overrides applied.
    pub fn aggregator(&self) -> AggregatorConfig {
        let g = &self.gateway;
        let base = g.profile.aggregator_defaults();
        AggregatorConfig {
            deadline_ms: g.deadline_ms.unwrap_or(base.deadline_ms),
            source_timeout_ms: g.source_timeout_ms.unwrap_or(base.source_timeout_ms),
            max_parallel: g.max_parallel.unwrap_or(base.max_parallel),
            cache_ttl_secs: g.cache_ttl_secs.unwrap_or(base.cache_ttl_secs),
            cache_max_entries: g.cache_max_entries.unwrap_or(base.cache_max_entries),
            default_limit: g.default_limit.unwrap_or(base.default_limit),
            max_limit: g.max_limit.unwrap_or(base.max_limit),
            min_term_len: g.min_term_len.unwrap_or(base.min_term_len),
            require_term: g.require_term.unwrap_or(base.require_term),
        }
    }

    /// The configured sources, or the profile's table when none are listed.
    pub fn effective_sources(&self) -> Vec<SourceSpec> {
        if self.sources.is_empty() {
            self.profile().default_sources()
        } else {
            self.sources.clone()
        }
    }

    /// Validates the whole configuration.
    ///
    /// Checks:
    /// - aggregator and breaker settings are within range
    /// - every source spec is well formed
    /// - source ids are unique (case-insensitive)
    pub fn validate(&self) -> Result<()> {
        self.aggregator().validate()?;
        self.breaker.validate()?;
        let mut seen = HashSet::new();
        for spec in &self.effective_sources() {
            spec.validate()?;
            if !seen.insert(spec.id.trim().to_lowercase()) {
                return Err(ServiceError::Config(format!(
                    "duplicate source id {:?}",
                    spec.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use petcare_aggregate::SourceKind;

    #[test]
    fn default_config_is_drug_profile() {
        let config = GatewayConfig::default();
        assert_eq!(config.profile(), Profile::Drugs);
        assert_eq!(config.port(), 8010);
        assert_eq!(config.aggregator().cache_ttl_secs, 3_600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn alerts_profile_changes_defaults() {
        let config = GatewayConfig::for_profile(Profile::Alerts);
        assert_eq!(config.port(), 8011);
        assert_eq!(config.aggregator().cache_ttl_secs, 1_800);
        assert!(!config.aggregator().require_term);
        let ids: Vec<_> = config.effective_sources().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["woah", "adis", "giw", "efsa"]);
    }

    #[test]
    fn gateway_overrides_win_over_profile() {
        let toml_str = r#"
            [gateway]
            profile = "alerts"
            cache_ttl_secs = 60
            max_parallel = 5
        "#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        let agg = config.aggregator();
        assert_eq!(agg.cache_ttl_secs, 60);
        assert_eq!(agg.max_parallel, 5);
        assert_eq!(agg.default_limit, 50);
    }

    #[test]
    fn explicit_sources_replace_profile_table() {
        let toml_str = r#"
            [[sources]]
            id = "formulary"
            kind = "formulary"
        "#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        let sources = config.effective_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Formulary);
        assert!(sources[0].enabled);
    }

    #[test]
    fn duplicate_source_ids_rejected() {
        let mut config = GatewayConfig::default();
        config.sources = vec![
            SourceSpec::new("formulary", SourceKind::Formulary, ""),
            SourceSpec::new("FORMULARY", SourceKind::Formulary, ""),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn invalid_override_rejected() {
        let mut config = GatewayConfig::default();
        config.gateway.default_limit = Some(500);
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_port_and_profile() {
        let mut config = GatewayConfig::default();
        config
            .apply_env_from(|key| match key {
                "PORT" => Some("9100".into()),
                "PETCARE_PROFILE" => Some("alerts".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.port(), 9100);
        assert_eq!(config.profile(), Profile::Alerts);
    }

    #[test]
    fn env_rejects_bad_port() {
        let mut config = GatewayConfig::default();
        let err = config
            .apply_env_from(|key| (key == "PORT").then(|| "eighty".to_owned()))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gateway.toml");

        let mut config = GatewayConfig::for_profile(Profile::Alerts);
        config.server.port = Some(0);
        config.gateway.cache_ttl_secs = Some(120);
        config.breaker.failure_threshold = 5;
        config.save_to_file(&path).unwrap();

        let loaded = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = GatewayConfig::from_file(Path::new("/nonexistent/path/gateway.toml"));
        assert!(matches!(result, Err(ServiceError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(
            GatewayConfig::from_file(&path),
            Err(ServiceError::Config(_))
        ));
    }

    #[test]
    fn default_config_path_ends_with_gateway_toml() {
        let path = GatewayConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("gateway.toml"));
    }
}
