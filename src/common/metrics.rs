//! Counters for the heartbeat and split paths, rendered in Prometheus text format

use once_cell::sync::Lazy;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide metrics registry
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    pub heartbeats_total: Counter,
    pub heartbeats_rejected: Counter,
    pub ask_split_total: Counter,
    pub ask_split_stale: Counter,
    pub report_split_total: Counter,
    pub report_split_invalid: Counter,
    pub ids_allocated: Counter,
}

impl Metrics {
    /// Render all counters in Prometheus exposition format
    pub fn to_prometheus(&self) -> String {
        let counters: [(&str, &str, &Counter); 7] = [
            (
                "minipd_region_heartbeats_total",
                "Region heartbeats received",
                &self.heartbeats_total,
            ),
            (
                "minipd_region_heartbeats_rejected_total",
                "Region heartbeats rejected as malformed",
                &self.heartbeats_rejected,
            ),
            (
                "minipd_ask_split_total",
                "AskSplit requests received",
                &self.ask_split_total,
            ),
            (
                "minipd_ask_split_stale_total",
                "AskSplit requests rejected for a stale epoch",
                &self.ask_split_stale,
            ),
            (
                "minipd_report_split_total",
                "ReportSplit requests received",
                &self.report_split_total,
            ),
            (
                "minipd_report_split_invalid_total",
                "ReportSplit requests rejected as invalid",
                &self.report_split_invalid,
            ),
            (
                "minipd_ids_allocated_total",
                "Identifiers handed out for splits",
                &self.ids_allocated,
            ),
        ];

        let mut out = String::new();
        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, counter.get());
        }
        out
    }
}
