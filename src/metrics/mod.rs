//! Prometheus metrics exporter for random method monitoring.
//!
//! # Metrics Exposed
//!
//! - `se_entropy_status` - Status slot reading (1=healthy, 0=quota exceeded)
//! - `se_entropy_requests_total` - Byte-generation requests received
//! - `se_entropy_bytes_total` - Random bytes produced
//! - `se_entropy_hardware_reseeds_total` - Reseeds from the secure element
//! - `se_entropy_hardware_failures_total` - Failed secure-element sessions
//! - `se_entropy_bytes_since_reseed` - Bytes counted against the current quota
//! - `se_entropy_last_reseed_timestamp_seconds` - Unix time of the last reseed
//!
//! # Example
//!
//! ```no_run
//! use se_entropy::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     is_healthy: true,
//!     requests: 100,
//!     bytes_generated: 3200,
//!     hardware_reseeds: 1,
//!     hardware_failures: 0,
//!     bytes_since_reseed: 3200,
//!     last_reseed_timestamp: None,
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
