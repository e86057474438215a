//! Observability infrastructure for the collector
//!
//! Provides:
//! - Prometheus metrics (host outcomes, command counts, parse errors, entity counts)
//! - Structured lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-host collection time (in seconds)
const HOST_LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CollectorMetricsInner> = OnceLock::new();

struct CollectorMetricsInner {
    hosts_collected: IntCounter,
    hosts_failed: IntCounter,
    commands_executed: IntCounterVec,
    commands_failed: IntCounterVec,
    parse_errors: IntCounterVec,
    entities_emitted: IntGaugeVec,
    host_collection_seconds: Histogram,
}

impl CollectorMetricsInner {
    fn new() -> Self {
        Self {
            hosts_collected: register_int_counter!(
                "prp_collector_hosts_collected_total",
                "Hosts that completed collection"
            )
            .expect("Failed to register hosts_collected"),

            hosts_failed: register_int_counter!(
                "prp_collector_hosts_failed_total",
                "Hosts that ended collection in the failed state"
            )
            .expect("Failed to register hosts_failed"),

            commands_executed: register_int_counter_vec!(
                "prp_collector_commands_executed_total",
                "Remote commands executed",
                &["command"]
            )
            .expect("Failed to register commands_executed"),

            commands_failed: register_int_counter_vec!(
                "prp_collector_commands_failed_total",
                "Remote commands that failed on the channel",
                &["command"]
            )
            .expect("Failed to register commands_failed"),

            parse_errors: register_int_counter_vec!(
                "prp_collector_parse_errors_total",
                "Records skipped by a command parser",
                &["command"]
            )
            .expect("Failed to register parse_errors"),

            entities_emitted: register_int_gauge_vec!(
                "prp_collector_entities_emitted",
                "Entities in the last result set",
                &["kind"]
            )
            .expect("Failed to register entities_emitted"),

            host_collection_seconds: register_histogram!(
                "prp_collector_host_collection_seconds",
                "Time spent collecting one host",
                HOST_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register host_collection_seconds"),
        }
    }
}

/// Collector metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CollectorMetricsInner {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new)
    }

    pub fn inc_hosts_collected(&self) {
        self.inner().hosts_collected.inc();
    }

    pub fn inc_hosts_failed(&self) {
        self.inner().hosts_failed.inc();
    }

    pub fn inc_command(&self, command: &str) {
        self.inner()
            .commands_executed
            .with_label_values(&[command])
            .inc();
    }

    pub fn inc_command_failed(&self, command: &str) {
        self.inner()
            .commands_failed
            .with_label_values(&[command])
            .inc();
    }

    pub fn add_parse_errors(&self, command: &str, count: usize) {
        if count > 0 {
            self.inner()
                .parse_errors
                .with_label_values(&[command])
                .inc_by(count as u64);
        }
    }

    pub fn set_entities(&self, kind: &str, count: usize) {
        self.inner()
            .entities_emitted
            .with_label_values(&[kind])
            .set(count as i64);
    }

    pub fn observe_host_collection(&self, duration_secs: f64) {
        self.inner().host_collection_seconds.observe(duration_secs);
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for collection lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    instance_id: String,
}

impl StructuredLogger {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
        }
    }

    pub fn log_run_started(&self, hosts: usize, max_parallel_hosts: usize) {
        info!(
            event = "run_started",
            instance = %self.instance_id,
            hosts,
            max_parallel_hosts,
            "Collection pass started"
        );
    }

    pub fn log_host_state(&self, host: &str, state: &str) {
        info!(
            event = "host_state",
            instance = %self.instance_id,
            host = %host,
            state = %state,
            "Host state changed"
        );
    }

    pub fn log_host_failed(&self, host: &str, state: &str, reason: &str) {
        warn!(
            event = "host_failed",
            instance = %self.instance_id,
            host = %host,
            state = %state,
            reason = %reason,
            "Host collection failed"
        );
    }

    pub fn log_run_finished(&self, hosts_collected: usize, hosts_failed: usize, entities: usize, elapsed_ms: u128) {
        if hosts_failed > 0 {
            warn!(
                event = "run_finished",
                instance = %self.instance_id,
                hosts_collected,
                hosts_failed,
                entities,
                elapsed_ms = elapsed_ms as u64,
                "Collection pass finished with failed hosts"
            );
        } else {
            info!(
                event = "run_finished",
                instance = %self.instance_id,
                hosts_collected,
                entities,
                elapsed_ms = elapsed_ms as u64,
                "Collection pass finished"
            );
        }
    }
}
