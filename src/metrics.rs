//! Prometheus metrics for the prediction API

use prometheus::{Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Request, latency and prediction metrics
///
/// Each instance owns its registry so tests can run side by side.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    pub requests_total: CounterVec,
    pub request_latency: HistogramVec,
    pub predictions_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("api_requests_total", "Total API requests"),
            &["method", "endpoint", "status"],
        )?;

        let request_latency = HistogramVec::new(
            HistogramOpts::new("api_request_latency_seconds", "API request latency"),
            &["method", "endpoint"],
        )?;

        let predictions_total = Counter::new("predictions_total", "Total predictions made")?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_latency,
            predictions_total,
        })
    }

    pub fn record_request(&self, method: &str, endpoint: &str, status: u16) {
        self.requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
    }

    pub fn observe_latency(&self, method: &str, endpoint: &str, latency_secs: f64) {
        self.request_latency
            .with_label_values(&[method, endpoint])
            .observe(latency_secs);
    }

    pub fn record_prediction(&self) {
        self.predictions_total.inc();
    }

    pub fn predictions(&self) -> u64 {
        self.predictions_total.get() as u64
    }

    /// Text exposition of every registered metric
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
