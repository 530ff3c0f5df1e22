//! # Observability
//!
//! Prometheus metrics for provider operations. Tracing spans are emitted at
//! the call sites; subscriber installation is left to the host.

pub mod metrics;
