//! # Metrics Module
//!
//! Prometheus metrics for monitoring the provider, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `provider_metrics` - Operation counters, durations, error reasons and live clients

pub mod provider_metrics;
pub mod registry;

pub use provider_metrics::*;
pub use registry::*;
