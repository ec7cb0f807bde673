//! Process metrics (ambient — see SPEC_FULL.md §B). Uses the teacher's
//! `metrics` + `metrics-exporter-prometheus` crates to expose request-level
//! counters alongside `/metrics`.

use metrics::{counter, Counter};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Counters sampled once and handed to request handlers, rather than looked
/// up by name on every call.
pub struct Metrics {
    pub requests_total: Counter,
    pub bids_total: Counter,
    pub no_bid_total: Counter,
    pub errors_total: Counter,
    pub reload_success_total: Counter,
    pub reload_failure_total: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: counter!("dsp_bid_requests_total"),
            bids_total: counter!("dsp_bid_responses_total"),
            no_bid_total: counter!("dsp_no_bid_responses_total"),
            errors_total: counter!("dsp_bid_errors_total"),
            reload_success_total: counter!("dsp_catalog_reload_success_total"),
            reload_failure_total: counter!("dsp_catalog_reload_failure_total"),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder and returns the address it's served
/// from. Call once at process start, before constructing [`Metrics`].
pub fn install_recorder() -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus recorder: {e}"))
}
