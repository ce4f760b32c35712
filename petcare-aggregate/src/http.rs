//! Shared HTTP plumbing for JSON provider APIs.
//!
//! Provides a configured [`reqwest::Client`] and a GET helper that maps every
//! transport and decoding problem onto a [`SourceFailure`] with the right
//! [`SourceErrorKind`].

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::GatewayError;
use crate::types::{SourceErrorKind, SourceFailure};

/// User-Agent sent to every upstream provider.
pub const USER_AGENT: &str = concat!("petcare-aggregate/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for provider APIs.
///
/// `timeout` is an upper bound for any request made with the client; each
/// request additionally carries its own per-call budget.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Join `path` onto `base`, tolerating a missing or extra trailing slash.
pub fn endpoint(base: &str, path: &str) -> Result<Url, GatewayError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| GatewayError::Config(format!("invalid URL {joined}: {e}")))
}

/// GET `url` and decode a JSON body.
///
/// Returns `Ok(None)` when the provider answers `404 Not Found`, which
/// several registries use to mean "no matches".
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    source: &str,
    budget: Duration,
) -> Result<Option<T>, SourceFailure> {
    tracing::trace!(source, %url, "provider request");

    let response = client
        .get(url)
        .timeout(budget)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| transport_failure(source, &e))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(SourceFailure {
            source: source.to_owned(),
            kind: SourceErrorKind::UpstreamError,
            message: format!("HTTP {}", status.as_u16()),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_failure(source, &e))?;

    tracing::trace!(source, bytes = body.len(), "provider response received");

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| SourceFailure {
            source: source.to_owned(),
            kind: SourceErrorKind::ParseError,
            message: format!("malformed payload: {e}"),
        })
}

/// Classify a transport-level error.
pub fn transport_failure(source: &str, err: &reqwest::Error) -> SourceFailure {
    let kind = if err.is_timeout() {
        SourceErrorKind::Timeout
    } else if err.is_decode() {
        SourceErrorKind::ParseError
    } else {
        SourceErrorKind::Unavailable
    };
    SourceFailure {
        source: source.to_owned(),
        kind,
        message: err.to_string(),
    }
}
