//! # Prometheus Metrics
//!
//! HTTP request counts, latency and errors are recorded by
//! [`metrics_middleware`]. Domain gauges (stored outcomes, capability
//! grants, publicly readable handles, threshold version) are refreshed from
//! [`cspin_engine::EngineStats`] on each `/metrics` scrape. Engine events
//! are counted by kind as they are broadcast.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use cspin_engine::EngineStats;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    engine_events_total: IntCounterVec,

    outcomes_total: Gauge,
    capability_grants_total: Gauge,
    public_handles_total: Gauge,
    config_version: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a metrics instance with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("cspin_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "cspin_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("cspin_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let engine_events_total = IntCounterVec::new(
            Opts::new("cspin_engine_events_total", "Engine change notifications by kind"),
            &["kind"],
        )?;

        let outcomes_total = Gauge::new("cspin_outcomes_total", "Principals with a stored outcome")?;
        let capability_grants_total =
            Gauge::new("cspin_capability_grants_total", "Recorded (handle, principal) grants")?;
        let public_handles_total =
            Gauge::new("cspin_public_handles_total", "Handles readable by everyone")?;
        let config_version = Gauge::new("cspin_config_version", "Current threshold config version")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(engine_events_total.clone()))?;
        registry.register(Box::new(outcomes_total.clone()))?;
        registry.register(Box::new(capability_grants_total.clone()))?;
        registry.register(Box::new(public_handles_total.clone()))?;
        registry.register(Box::new(config_version.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                engine_events_total,
                outcomes_total,
                capability_grants_total,
                public_handles_total,
                config_version,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx/5xx count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Count one broadcast engine event.
    pub fn record_event(&self, kind: &str) {
        self.inner.engine_events_total.with_label_values(&[kind]).inc();
    }

    /// Refresh the domain gauges.
    pub fn observe_engine(&self, stats: &EngineStats) {
        self.inner.outcomes_total.set(stats.outcomes as f64);
        self.inner.capability_grants_total.set(stats.grants as f64);
        self.inner.public_handles_total.set(stats.public_handles as f64);
        self.inner.config_version.set(stats.config_version as f64);
    }

    /// Gather all metrics in Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Replace principal and handle path segments with placeholders to keep
/// label cardinality bounded.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut out = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let parent = i.checked_sub(1).and_then(|j| segments.get(j)).copied();
        let replaced = match parent {
            Some("spins") if *segment != "escalate" => "{principal}",
            Some("capabilities") => "{handle}",
            _ => *segment,
        };
        out.push(replaced);
    }
    out.join("/")
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}
