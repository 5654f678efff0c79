#![deny(missing_docs)]

//! Shared configuration, error types, and observability primitives for weir crates.
//!
//! Architecture role:
//! - defines the runtime configuration passed across layers
//! - provides the common [`WeirError`] / [`Result`] contracts
//! - hosts the metrics registry and the HTTP exporter

/// Shared runtime configuration types.
pub mod config;
/// Shared error taxonomy.
pub mod error;
/// Metrics registry and Prometheus rendering helpers.
pub mod metrics;
/// HTTP metrics exporter.
pub mod metrics_exporter;

pub use config::EngineConfig;
pub use error::{Result, WeirError};
pub use metrics::{global_metrics, MetricsRegistry, OperatorMetrics};
pub use metrics_exporter::run_metrics_exporter;
