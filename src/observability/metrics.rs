use prometheus::{
    Counter, CounterVec, Histogram, HistogramVec, Registry, histogram_opts, opts,
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry,
};

/// Worker-level Prometheus metrics.
#[derive(Clone)]
pub struct Metrics {
    pub pipeline_runs_completed: Counter,
    pub pipeline_runs_failed: CounterVec,
    pub degraded_mood_profiles: Counter,
    pub tag_fetch_failures: Counter,
    pub images_ingested: Counter,
    pub pipeline_duration: Histogram,
    pub stage_duration: HistogramVec,
}

impl Metrics {
    /// Register the worker metrics against the given registry.
    ///
    /// # Errors
    /// Returns a [`prometheus::Error`] on duplicate or invalid registration.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            pipeline_runs_completed: register_counter_with_registry!(
                "musemix_pipeline_runs_completed_total",
                "Recommendation pipeline runs that produced a payload",
                registry
            )?,
            pipeline_runs_failed: register_counter_vec_with_registry!(
                opts!(
                    "musemix_pipeline_runs_failed_total",
                    "Recommendation pipeline runs aborted by a fatal stage error"
                ),
                &["stage"],
                registry
            )?,
            degraded_mood_profiles: register_counter_with_registry!(
                "musemix_degraded_mood_profiles_total",
                "Mood inference replies that failed strict parsing and were recovered",
                registry
            )?,
            tag_fetch_failures: register_counter_with_registry!(
                "musemix_tag_fetch_failures_total",
                "Per-tag catalog lookups that failed and were skipped",
                registry
            )?,
            images_ingested: register_counter_with_registry!(
                "musemix_images_ingested_total",
                "Image records inserted into the embedding store",
                registry
            )?,
            pipeline_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "musemix_pipeline_duration_seconds",
                    "Wall-clock duration of one recommendation pipeline run"
                ),
                registry
            )?,
            stage_duration: register_histogram_vec_with_registry!(
                histogram_opts!(
                    "musemix_stage_duration_seconds",
                    "Wall-clock duration of each pipeline stage"
                ),
                &["stage"],
                registry
            )?,
        })
    }
}
