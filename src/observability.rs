pub mod metrics;
pub mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Owns tracing initialization and the Prometheus registry.
#[derive(Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Initialize tracing (once per process) and register the worker metrics.
    ///
    /// # Errors
    /// Returns an error when the tracing subscriber or a metric fails to register.
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(&registry)?);
        Ok(Self { registry, metrics })
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Render the registry in Prometheus text exposition format.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}
