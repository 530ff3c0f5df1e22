//! # Provider Metrics
//!
//! Metrics for provider operations: per-operation outcomes and durations,
//! error reasons, and the number of live transport clients.

use crate::errors::Result as ProviderResult;
use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, IntGauge};
use std::sync::LazyLock;
use std::time::Instant;

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secretmanager_provider_operations_total",
            "Total number of provider operations by outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "secretmanager_provider_operation_duration_seconds",
            "Duration of provider operations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0]),
        &["operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secretmanager_provider_operation_errors_total",
            "Total number of provider errors by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static ACTIVE_CLIENTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "secretmanager_provider_active_clients",
        "Current number of provider instances holding a client lease",
    )
    .expect("Failed to create ACTIVE_CLIENTS metric - this should never happen")
});

/// Register provider metrics with the registry
pub(crate) fn register_provider_metrics() -> Result<()> {
    REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTIVE_CLIENTS.clone()))?;
    Ok(())
}

/// Record outcome and duration of one operation
pub fn record_operation<T>(operation: &str, started: Instant, result: &ProviderResult<T>) {
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
    match result {
        Ok(_) => OPERATIONS_TOTAL
            .with_label_values(&[operation, "success"])
            .inc(),
        Err(e) => {
            OPERATIONS_TOTAL
                .with_label_values(&[operation, "error"])
                .inc();
            OPERATION_ERRORS_TOTAL.with_label_values(&[e.reason()]).inc();
        }
    }
}

pub fn inc_active_clients() {
    ACTIVE_CLIENTS.inc();
}

pub fn dec_active_clients() {
    ACTIVE_CLIENTS.dec();
}
