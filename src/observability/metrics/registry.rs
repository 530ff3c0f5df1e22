//! # Metrics Registry
//!
//! Prometheus metrics registry setup and registration.

use anyhow::Result;
use prometheus::Registry;
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register all provider metrics with the Prometheus registry
///
/// Call once at startup. Prometheus `Registry::register()` takes ownership,
/// so the metrics are cloned; clones share the same underlying values.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    super::provider_metrics::register_provider_metrics()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exposes_provider_metrics() {
        register_metrics().expect("first registration");
        super::super::provider_metrics::inc_active_clients();
        let names: Vec<String> = REGISTRY
            .gather()
            .into_iter()
            .map(|family| family.name().to_string())
            .collect();
        assert!(names.contains(&"secretmanager_provider_active_clients".to_string()));
        super::super::provider_metrics::dec_active_clients();
    }
}
