//! Metrics collection and registry.

use crate::adapter::{AdapterStats, EntropyAdapter, RandError};
use crate::device::SecureElement;
use crate::method::RandEngine;
use crate::software::SoftwareRng;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("engine unavailable: {0}")]
    Engine(#[from] RandError),
}

/// A snapshot of random method state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the random method reports healthy.
    pub is_healthy: bool,
    /// Byte-generation requests received.
    pub requests: u64,
    /// Bytes successfully produced.
    pub bytes_generated: u64,
    /// Successful hardware reseeds.
    pub hardware_reseeds: u64,
    /// Failed hardware sessions.
    pub hardware_failures: u64,
    /// Bytes counted against the current quota.
    pub bytes_since_reseed: u64,
    /// Unix time of the last hardware reseed, if any.
    pub last_reseed_timestamp: Option<i64>,
}

/// Prometheus metrics registry for the random method.
pub struct MetricsRegistry {
    registry: Registry,

    status: IntGauge,
    requests_total: IntCounter,
    bytes_total: IntCounter,
    hardware_reseeds_total: IntCounter,
    hardware_failures_total: IntCounter,
    bytes_since_reseed: IntGauge,
    last_reseed_timestamp: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all random method metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let status = IntGauge::new(
            "se_entropy_status",
            "Random method status (1=healthy, 0=quota exceeded)",
        )?;
        let requests_total = IntCounter::new(
            "se_entropy_requests_total",
            "Total byte-generation requests received",
        )?;
        let bytes_total = IntCounter::new(
            "se_entropy_bytes_total",
            "Total random bytes produced",
        )?;
        let hardware_reseeds_total = IntCounter::new(
            "se_entropy_hardware_reseeds_total",
            "Total software PRNG reseeds from the secure element",
        )?;
        let hardware_failures_total = IntCounter::new(
            "se_entropy_hardware_failures_total",
            "Total failed secure-element sessions",
        )?;
        let bytes_since_reseed = IntGauge::new(
            "se_entropy_bytes_since_reseed",
            "Bytes counted against the current reseed quota",
        )?;
        let last_reseed_timestamp = IntGauge::new(
            "se_entropy_last_reseed_timestamp_seconds",
            "Unix time of the last hardware reseed",
        )?;

        registry.register(Box::new(status.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(bytes_total.clone()))?;
        registry.register(Box::new(hardware_reseeds_total.clone()))?;
        registry.register(Box::new(hardware_failures_total.clone()))?;
        registry.register(Box::new(bytes_since_reseed.clone()))?;
        registry.register(Box::new(last_reseed_timestamp.clone()))?;

        Ok(Self {
            registry,
            status,
            requests_total,
            bytes_total,
            hardware_reseeds_total,
            hardware_failures_total,
            bytes_since_reseed,
            last_reseed_timestamp,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.status.set(if snapshot.is_healthy { 1 } else { 0 });
        self.bytes_since_reseed
            .set(i64::try_from(snapshot.bytes_since_reseed).unwrap_or(i64::MAX));
        if let Some(ts) = snapshot.last_reseed_timestamp {
            self.last_reseed_timestamp.set(ts);
        }

        // Counters only move forward; apply the difference.
        advance(&self.requests_total, snapshot.requests);
        advance(&self.bytes_total, snapshot.bytes_generated);
        advance(&self.hardware_reseeds_total, snapshot.hardware_reseeds);
        advance(&self.hardware_failures_total, snapshot.hardware_failures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from adapter counters and a status reading.
    pub fn from_stats(stats: &AdapterStats, bytes_since_reseed: u64, is_healthy: bool) -> Self {
        Self {
            is_healthy,
            requests: stats.requests,
            bytes_generated: stats.bytes_generated,
            hardware_reseeds: stats.hardware_reseeds,
            hardware_failures: stats.hardware_failures,
            bytes_since_reseed,
            last_reseed_timestamp: stats.last_reseed.map(|t| t.timestamp()),
        }
    }

    /// Creates a snapshot from the current state of an engine.
    ///
    /// Health and counters come from the same lock acquisition.
    pub fn from_engine<S, D>(engine: &RandEngine<S, D>) -> Result<Self, MetricsError>
    where
        S: SoftwareRng,
        D: SecureElement,
    {
        let snapshot = engine.snapshot(|adapter: &EntropyAdapter<S, D>, is_healthy| {
            Self::from_stats(adapter.stats(), adapter.counter().total(), is_healthy)
        })?;
        Ok(snapshot)
    }
}
