//! Metric events
//!
//! The manager reports what it does through an injected [`MetricsSink`], so
//! it has no compile-time dependency on a particular telemetry backend.
//! Two sinks ship with the crate: [`NoopMetrics`] (the default) and
//! [`PrometheusMetrics`], which feeds registered counter vecs suitable for
//! a `/metrics` scrape endpoint.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, TextEncoder, register_int_counter_vec};

/// Receiver for structured cache events
///
/// Event names: `cache_hit`, `cache_miss`, `cache_set`, `cache_delete`,
/// `cache_invalidate_tag`, `cache_clear`. Attributes always carry the
/// manager `namespace`; hits add the serving `level` index, tag
/// invalidations add the `tag` and the snapshot `keys` count.
pub trait MetricsSink: Send + Sync {
    fn record(&self, name: &str, attrs: &[(&str, String)]);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _name: &str, _attrs: &[(&str, String)]) {}
}

lazy_static! {
    /// Total cache operations by type
    pub static ref CACHE_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_cache_operations_total",
        "Total number of cache operations by type",
        &["operation", "namespace"]
    )
    .unwrap();

    /// Lookups by outcome and the level that answered
    pub static ref CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "strata_cache_lookups_total",
        "Cache lookups by outcome and serving level",
        &["outcome", "level", "namespace"]
    )
    .unwrap();
}

/// Prometheus-backed sink
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn record(&self, name: &str, attrs: &[(&str, String)]) {
        let namespace = attr(attrs, "namespace");
        match name {
            "cache_hit" => {
                CACHE_LOOKUPS_TOTAL
                    .with_label_values(&["hit", attr(attrs, "level"), namespace])
                    .inc();
            }
            "cache_miss" => {
                CACHE_LOOKUPS_TOTAL
                    .with_label_values(&["miss", "", namespace])
                    .inc();
            }
            _ => {
                CACHE_OPS_TOTAL.with_label_values(&[name, namespace]).inc();
            }
        }
    }
}

fn attr<'a>(attrs: &'a [(&str, String)], key: &str) -> &'a str {
    attrs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// Encode the process-wide metric registry in the Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
