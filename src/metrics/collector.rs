// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MonitorMode;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Receive side
    pub heartbeats_total: IntCounterVec,

    // Monitor side
    pub probes_total: IntCounterVec,
    pub probe_wait_seconds: HistogramVec,
    pub probes_waiting: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let heartbeats_total = IntCounterVec::new(
            Opts::new("hb_heartbeats_total", "Heartbeats received, by deposit outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(heartbeats_total.clone()))?;

        let probes_total = IntCounterVec::new(
            Opts::new("hb_probes_total", "Monitor probes answered, by outcome"),
            &["mode", "outcome"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hb_probe_wait_seconds",
                "Time between probe arrival and its answer",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["mode"],
        )?;
        registry.register(Box::new(probe_wait_seconds.clone()))?;

        let probes_waiting =
            IntGauge::new("hb_probes_waiting", "Blocking probes waiting for a heartbeat")?;
        registry.register(Box::new(probes_waiting.clone()))?;

        Ok(Self {
            heartbeats_total,
            probes_total,
            probe_wait_seconds,
            probes_waiting,
        })
    }

    pub fn record_heartbeat(&self, accepted: bool) {
        let outcome = if accepted { "accepted" } else { "dropped" };
        self.heartbeats_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_probe(&self, mode: MonitorMode, alive: bool, waited: Duration) {
        let outcome = if alive { "alive" } else { "absent" };
        self.probes_total
            .with_label_values(&[mode.as_str(), outcome])
            .inc();

        self.probe_wait_seconds
            .with_label_values(&[mode.as_str()])
            .observe(waited.as_secs_f64());
    }

    /// Track a suspended probe until the returned guard drops.
    pub fn probe_waiting(self: &Arc<Self>) -> WaitingGuard {
        self.probes_waiting.inc();
        WaitingGuard {
            collector: self.clone(),
        }
    }
}

/// Decrements `hb_probes_waiting` on drop, including when the probe is cancelled.
pub struct WaitingGuard {
    collector: Arc<MetricsCollector>,
}

impl Drop for WaitingGuard {
    fn drop(&mut self) {
        self.collector.probes_waiting.dec();
    }
}
