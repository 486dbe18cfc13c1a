//! Prometheus metrics for pipeline runs.
//!
//! This module provides metrics for:
//! - Pipeline runs (by final status)
//! - Transfers (per hop outcome, time spent waiting)
//! - Ingestion submissions and deletion scheduling
//!
//! A run is a short-lived process, so the registry is dumped with
//! [`encode_metrics`] at the end instead of being scraped.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Pipeline
// =============================================================================

/// Pipeline runs by result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("datamover_pipeline_runs_total", "Total pipeline runs"),
        &["result"], // "done", "degraded", "failed"
    )
    .unwrap()
});

// =============================================================================
// Transfers
// =============================================================================

/// Transfers by hop and outcome.
pub static TRANSFERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("datamover_transfers_total", "Total monitored transfers"),
        &["hop", "outcome"],
    )
    .unwrap()
});

/// Time from submission to terminal outcome.
pub static TRANSFER_WAIT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "datamover_transfer_wait_seconds",
            "Time spent waiting for a transfer to finish",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Downstream services
// =============================================================================

/// Ingestion submissions by result.
pub static INGEST_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "datamover_ingest_submissions_total",
            "Total ingestion job submissions",
        ),
        &["result"], // "accepted", "failed"
    )
    .unwrap()
});

/// Deferred deletion registrations by tier and result.
pub static DELETIONS_SCHEDULED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "datamover_deletions_scheduled_total",
            "Total deferred deletion registrations",
        ),
        &["tier", "result"], // result: "accepted", "rejected"
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry.register(Box::new(PIPELINE_RUNS.clone())).unwrap();
    registry
        .register(Box::new(TRANSFERS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(TRANSFER_WAIT_SECONDS.clone()))
        .unwrap();
    registry
        .register(Box::new(INGEST_SUBMISSIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(DELETIONS_SCHEDULED.clone()))
        .unwrap();
}

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
