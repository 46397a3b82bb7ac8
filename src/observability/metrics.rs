use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Transport metrics
    pub http_requests: IntCounterVec,
    pub http_retries: IntCounter,
    pub http_request_duration: HistogramVec,

    // Auth metrics
    pub token_refreshes: IntCounterVec,

    // Metadata metrics
    pub metadata_loads: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("entityclient".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Transport
            http_requests: IntCounterVec::new(Opts::new("http_requests_total", "Dispatch attempts by method and outcome"),&["method", "outcome"],).unwrap(),
            http_retries: IntCounter::new("http_retries_total", "Retried dispatch attempts").unwrap(),
            http_request_duration: HistogramVec::new(HistogramOpts::new("http_request_duration_seconds", "Request duration seconds, retries included").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),&["method"],).unwrap(),

            // Auth
            token_refreshes: IntCounterVec::new(Opts::new("token_refreshes_total", "Credential refreshes by result"),&["result"],).unwrap(),

            // Metadata
            metadata_loads: IntCounterVec::new(Opts::new("metadata_loads_total", "Tenant metadata loads by result"),&["tenant", "result"],).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.http_requests.clone())).unwrap();
        reg.register(Box::new(metrics.http_retries.clone())).unwrap();
        reg.register(Box::new(metrics.http_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.metadata_loads.clone())).unwrap();

        metrics
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gathers_registered_families() {
        let metrics = get_metrics().await;
        metrics.token_refreshes.with_label_values(&["ok"]).inc();
        let text = metrics.gather().unwrap();
        assert!(text.contains("entityclient_token_refreshes_total"));
    }
}
