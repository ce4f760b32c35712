//! Error types for the gateway service.

use petcare_aggregate::GatewayError;

/// Top-level error type for the gateway service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Error raised by the aggregation layer while wiring sources.
    #[error(transparent)]
    Aggregate(#[from] GatewayError),

    /// HTTP server error (bind, serve).
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_errors_are_transparent() {
        let err: ServiceError = GatewayError::Config("duplicate source id urpl".into()).into();
        assert_eq!(err.to_string(), "config error: duplicate source id urpl");
    }

    #[test]
    fn io_errors_convert() {
        let err: ServiceError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn server_display() {
        let err = ServiceError::Server("bind failed".into());
        assert_eq!(err.to_string(), "server error: bind failed");
    }
}
