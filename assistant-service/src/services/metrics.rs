//! Prometheus metrics for assistant-service.
//!
//! Flow-level request counts and latency, plus provider latency, token and
//! error counters.

use crate::services::providers::{ProviderError, ProviderResponse};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};
use std::time::Duration;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Flow metrics
pub static FLOW_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static FLOW_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Provider metrics
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(register_metrics);
}

fn register_metrics() {
    let registry = Registry::new();

    let flow_requests = IntCounterVec::new(
        Opts::new("flow_requests_total", "Total flow invocations"),
        &["flow", "status"],
    )
    .expect("Failed to create flow_requests_total metric");

    let flow_duration = HistogramVec::new(
        HistogramOpts::new("flow_duration_seconds", "Flow duration in seconds")
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["flow"],
    )
    .expect("Failed to create flow_duration_seconds metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "genai_provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["model"],
    )
    .expect("Failed to create genai_provider_latency_seconds metric");

    let provider_tokens = IntCounterVec::new(
        Opts::new("genai_tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
    )
    .expect("Failed to create genai_tokens_total metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("genai_provider_errors_total", "Total AI provider errors"),
        &["model", "error_type"],
    )
    .expect("Failed to create genai_provider_errors_total metric");

    registry
        .register(Box::new(flow_requests.clone()))
        .expect("Failed to register flow_requests_total");
    registry
        .register(Box::new(flow_duration.clone()))
        .expect("Failed to register flow_duration_seconds");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register genai_provider_latency_seconds");
    registry
        .register(Box::new(provider_tokens.clone()))
        .expect("Failed to register genai_tokens_total");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register genai_provider_errors_total");

    let _ = REGISTRY.set(registry);
    let _ = FLOW_REQUESTS_TOTAL.set(flow_requests);
    let _ = FLOW_DURATION_SECONDS.set(flow_duration);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_TOKENS_TOTAL.set(provider_tokens);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let Some(registry) = REGISTRY.get() else {
        tracing::error!("Metrics registry not initialized");
        return "# Metrics registry not initialized\n".to_string();
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record a finished flow invocation.
pub fn record_flow(flow: &str, status: &str, elapsed: Duration) {
    if let Some(counter) = FLOW_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[flow, status]).inc();
    }
    if let Some(histogram) = FLOW_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[flow])
            .observe(elapsed.as_secs_f64());
    }
}

/// Record latency plus either token usage or the error kind of one call.
pub fn record_provider_call(
    model: &str,
    elapsed: Duration,
    result: &Result<ProviderResponse, ProviderError>,
) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[model])
            .observe(elapsed.as_secs_f64());
    }

    match result {
        Ok(response) => {
            if let Some(counter) = PROVIDER_TOKENS_TOTAL.get() {
                counter
                    .with_label_values(&[model, "input"])
                    .inc_by(response.input_tokens.max(0) as u64);
                counter
                    .with_label_values(&[model, "output"])
                    .inc_by(response.output_tokens.max(0) as u64);
            }
        }
        Err(err) => {
            if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
                counter.with_label_values(&[model, err.kind()]).inc();
            }
        }
    }
}
