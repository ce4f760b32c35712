//! Error types for the petcare-aggregate crate.
//!
//! Only caller errors and configuration errors are represented here. Upstream
//! provider failures never surface as [`GatewayError`]; they are reported as
//! data on the aggregated response (see [`crate::types::SourceErrorKind`]).

/// Errors that abort a lookup before any source is contacted.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The query is malformed (term too short, bad limit, no parameters).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The source selector named an id that is not registered.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// The source selector resolved to no sources at all.
    #[error("no sources selected")]
    NoSourcesSelected,

    /// Invalid aggregator or source configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether this error was caused by the caller rather than the gateway.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Convenience type alias for petcare-aggregate results.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_query() {
        let err = GatewayError::InvalidQuery("term must be at least 2 characters".into());
        assert_eq!(
            err.to_string(),
            "invalid query: term must be at least 2 characters"
        );
    }

    #[test]
    fn display_unknown_source() {
        let err = GatewayError::UnknownSource("xyz".into());
        assert_eq!(err.to_string(), "unknown source: xyz");
    }

    #[test]
    fn display_no_sources() {
        assert_eq!(
            GatewayError::NoSourcesSelected.to_string(),
            "no sources selected"
        );
    }

    #[test]
    fn config_error_is_not_caller_error() {
        assert!(!GatewayError::Config("bad".into()).is_caller_error());
        assert!(GatewayError::UnknownSource("x".into()).is_caller_error());
        assert!(GatewayError::NoSourcesSelected.is_caller_error());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
