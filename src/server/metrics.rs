use crate::llm::TokenUsage;
use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Chordcraft metrics
const PREFIX: &str = "chordcraft";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Generation Metrics
    pub static ref GENERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_generations_total"), "Generation requests by kind and outcome"),
        &["kind", "outcome"]
    ).expect("Failed to create generations_total metric");

    pub static ref LLM_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_llm_request_duration_seconds"),
            "Time spent waiting for the text-generation service"
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0, 120.0]),
        &["kind"]
    ).expect("Failed to create llm_request_duration_seconds metric");

    pub static ref LLM_TOKENS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_llm_tokens_total"), "Tokens reported by the text-generation service"),
        &["kind", "type"]
    ).expect("Failed to create llm_tokens_total metric");

    // Store Metrics
    pub static ref STORE_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_errors_total"), "Content store failures by operation"),
        &["operation"]
    ).expect("Failed to create store_errors_total metric");

    pub static ref LIBRARY_SIZE: Gauge = Gauge::new(
        format!("{PREFIX}_library_size"),
        "Entries in the library index"
    ).expect("Failed to create library_size metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(GENERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LLM_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LLM_TOKENS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LIBRARY_SIZE.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of one generation. `outcome` is "success" or an error kind.
pub fn record_generation(kind: &str, outcome: &str) {
    GENERATIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_llm_request(kind: &str, duration: Duration, usage: Option<TokenUsage>) {
    LLM_REQUEST_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());

    if let Some(usage) = usage {
        LLM_TOKENS_TOTAL
            .with_label_values(&[kind, "prompt"])
            .inc_by(usage.prompt_tokens as f64);
        LLM_TOKENS_TOTAL
            .with_label_values(&[kind, "completion"])
            .inc_by(usage.completion_tokens as f64);
    }
}

pub fn record_store_error(operation: &str) {
    STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn set_library_size(entries: usize) {
    LIBRARY_SIZE.set(entries as f64);
}

pub fn inc_library_size() {
    LIBRARY_SIZE.inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
