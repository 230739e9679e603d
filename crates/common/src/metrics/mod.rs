//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.
//! Recording is a no-op until a recorder is installed (the gateway installs
//! the Prometheus exporter).

use metrics::{counter, describe_counter, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all bouwrag metrics
pub const METRICS_PREFIX: &str = "bouwrag";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s, agent runs
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of retrieval queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval latency in seconds"
    );

    describe_counter!(
        format!("{}_multi_hop_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total multi-hop retrieval runs"
    );

    describe_histogram!(
        format!("{}_multi_hop_hops", METRICS_PREFIX),
        Unit::Count,
        "Hops executed per multi-hop run"
    );

    describe_counter!(
        format!("{}_agent_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total agent runs by confidence and synthesis"
    );

    describe_histogram!(
        format!("{}_agent_turns", METRICS_PREFIX),
        Unit::Count,
        "Model turns per agent run"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat model requests"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat model latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record retrieval metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record a completed multi-hop run
pub fn record_multi_hop(hops: usize, chunk_count: usize) {
    counter!(format!("{}_multi_hop_runs_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_multi_hop_hops", METRICS_PREFIX)).record(hops as f64);
    gauge!(format!("{}_multi_hop_chunks", METRICS_PREFIX)).set(chunk_count as f64);
}

/// Helper to record a completed agent run
pub fn record_agent_run(turns: usize, confidence: &str, synthesized: bool) {
    counter!(
        format!("{}_agent_runs_total", METRICS_PREFIX),
        "confidence" => confidence.to_string(),
        "synthesized" => synthesized.to_string()
    )
    .increment(1);

    histogram!(format!("{}_agent_turns", METRICS_PREFIX)).record(turns as f64);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);

        gauge!(
            format!("{}_embedding_batch_size", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .set(batch_size as f64);
    }
}

/// Helper to record chat model metrics
pub fn record_llm(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("POST", "/v2/projects/search");
        metrics.finish(200);
        record_search(0.01, "hybrid", 3);
        record_multi_hop(2, 7);
        record_agent_run(3, "medium", true);
        record_llm(0.5, "gpt-4o", true);
    }
}
