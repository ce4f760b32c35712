//! HTTP surface of the gateway.
//!
//! ## Endpoints
//!
//! - `GET /query` - aggregated lookup across the selected sources
//! - `GET /sources` - registered source descriptors
//! - `GET /health` - liveness plus per-source circuit state
//! - `GET /stats` - cache and registry counters
//! - `GET /categories` - reference list for the active profile
//! - `GET /alerts/asf` - ASF restriction zones (alerts profile only, 404 otherwise)
//!
//! Upstream failures are reported inside a 200 response. Only caller
//! mistakes (bad term, bad limit, unknown source) produce a 400.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use petcare_aggregate::{CircuitState, QueryRequest, QueryRouter};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::profile::Profile;

#[derive(Clone)]
struct AppState {
    router: QueryRouter,
    profile: Profile,
}

/// Build the axum application for `router` under `profile`.
pub fn app(router: QueryRouter, profile: Profile) -> Router {
    Router::new()
        .route("/query", get(handle_query))
        .route("/sources", get(handle_sources))
        .route("/health", get(handle_health))
        .route("/stats", get(handle_stats))
        .route("/categories", get(handle_categories))
        .route("/alerts/asf", get(handle_asf))
        .with_state(AppState { router, profile })
}

/// Running gateway HTTP server.
pub struct GatewayServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl GatewayServer {
    /// Start serving in a background tokio task.
    ///
    /// Binds to `{host}:{port}`; port `0` auto-assigns.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(
        router: QueryRouter,
        profile: Profile,
        host: &str,
        port: u16,
    ) -> Result<Self> {
        let bind_addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServiceError::Server(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Server(format!("failed to get local addr: {e}")))?;

        info!(
            service = profile.service_name(),
            %profile,
            "gateway listening on http://{addr}"
        );

        let app = app(router, profile);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("gateway server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_query(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let mut request = QueryRequest::from_params(params);
    for (key, value) in state.profile.default_filters() {
        if !request.filters.iter().any(|(k, _)| k.eq_ignore_ascii_case(key)) {
            request.filters.push(((*key).to_owned(), (*value).to_owned()));
        }
    }

    match state.router.handle(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "rejected lookup");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn handle_sources(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.coordinator().registry().descriptors())
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.router.coordinator();
    let report = coordinator.circuit_health();
    let sources: Vec<_> = coordinator
        .registry()
        .descriptors()
        .into_iter()
        .map(|d| {
            let (circuit, failures) = report
                .iter()
                .find(|(id, _, _)| id.eq_ignore_ascii_case(&d.id))
                .map_or((CircuitState::Closed, 0), |(_, state, n)| (*state, *n));
            serde_json::json!({
                "id": d.id,
                "name": d.name,
                "circuit": circuit,
                "failures": failures,
            })
        })
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "service": state.profile.service_name(),
        "profile": state.profile,
        "sources": sources,
    }))
}

async fn handle_stats(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.router.coordinator();
    let registry = coordinator.registry();
    let live: Vec<_> = registry
        .descriptors()
        .into_iter()
        .filter(|d| d.supports_live_query)
        .map(|d| d.id)
        .collect();

    Json(serde_json::json!({
        "cacheEntries": coordinator.cache().len().await,
        "sourceCount": registry.len(),
        "liveSources": live,
    }))
}

async fn handle_categories(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "profile": state.profile,
        "categories": state.profile.categories(),
    }))
}

async fn handle_asf(State(state): State<AppState>) -> Response {
    match state.profile.asf_reference() {
        Some(reference) => (StatusCode::OK, Json(reference)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("ASF zones are not served by {}", state.profile.service_name())
            })),
        )
            .into_response(),
    }
}
