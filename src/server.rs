//! HTTP surface of the exporter.
//!
//! `/probe` scrapes one device named in the query string, `/metrics` fans
//! out over the configured devices and adds process metrics.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::exposition::{ExporterRegistry, ExpositionError, encode_text, families};
use crate::probe::Prober;

const LANDING_PAGE: &str = r#"<html>
<head><title>MikroTik Exporter</title></head>
<body>
<h1>MikroTik Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/probe?target=192.0.2.1&amp;module=default">Probe example</a></p>
</body>
</html>
"#;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub prober: Arc<Prober>,
    pub registry: ExporterRegistry,
    /// Cancelled on shutdown; every request scrapes under a child token.
    pub shutdown: CancellationToken,
}

/// Query parameters for `/probe`.
#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    pub target: Option<String>,
    pub module: Option<String>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route("/healthz", get(healthz_handler))
        .route("/probe", get(probe_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(Arc::new(state))
}

async fn landing_handler() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Liveness probe.
async fn healthz_handler() -> &'static str {
    "ok"
}

/// Scrape a single target with a named module.
async fn probe_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProbeParams>,
) -> Response {
    let job = match state
        .prober
        .resolve(params.target.as_deref(), params.module.as_deref())
    {
        Ok(job) => job,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected probe request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let cancel = state.shutdown.child_token();
    let observations = state.prober.probe(&job, &cancel).await;
    exposition_response(encode_text(&families(&observations, false)))
}

/// Scrape every configured device.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let cancel = state.shutdown.child_token();
    let observations = state.prober.scrape_devices(&cancel).await;
    exposition_response(state.registry.encode(&observations, true))
}

fn exposition_response(body: Result<String, ExpositionError>) -> Response {
    match body {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
