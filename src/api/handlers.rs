//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::arbitrage::ArbitrageOpportunity;
use crate::crawl::{CrawlProgress, ProgressSnapshot};
use crate::error::SinkError;
use crate::sink::ResultSink;

/// Application state shared with handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Whether the crawler has started.
    pub ready: Arc<AtomicBool>,
    /// Live crawl counters.
    pub progress: CrawlProgress,
    /// Mirror of the current opportunity list.
    pub opportunities: Arc<RwLock<Vec<ArbitrageOpportunity>>>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `/metrics` from this handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Sink that keeps [`AppState::opportunities`] in step with a collector.
    pub fn sink(&self) -> StatusSink {
        StatusSink {
            opportunities: Arc::clone(&self.opportunities),
        }
    }

    /// Copy of the current opportunity list.
    pub fn opportunities(&self) -> Vec<ArbitrageOpportunity> {
        self.opportunities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// [`ResultSink`] mirroring the collector's list into [`AppState`].
#[derive(Debug, Clone)]
pub struct StatusSink {
    opportunities: Arc<RwLock<Vec<ArbitrageOpportunity>>>,
}

impl ResultSink for StatusSink {
    fn publish(
        &mut self,
        _latest: &ArbitrageOpportunity,
        all: &[ArbitrageOpportunity],
        _suppress: bool,
    ) -> Result<(), SinkError> {
        let mut list = self
            .opportunities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *list = all.to_vec();
        Ok(())
    }

    fn cleared(&mut self) -> Result<(), SinkError> {
        self.opportunities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "status"
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Whether a crawl pass is in progress.
    pub crawling: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Crawl counters.
    pub progress: ProgressSnapshot,
    /// Opportunities currently listed.
    pub opportunities: usize,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        crawling: state.progress.snapshot().running,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns crawl counters.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let progress = state.progress.snapshot();
    let status = match (state.is_ready(), progress.running) {
        (false, _) => "starting",
        (true, true) => "crawling",
        (true, false) => "idle",
    };

    Json(StatusResponse {
        status,
        progress,
        opportunities: state.opportunities().len(),
    })
}

/// Opportunities handler - returns the current list.
pub async fn opportunities(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.opportunities())
}

/// Metrics handler - renders Prometheus text, 404 without a recorder.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
