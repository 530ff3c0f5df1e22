//! # Provider Configuration
//!
//! Process-level configuration loaded from environment variables.
//!
//! All configuration has sensible defaults and can be overridden via
//! environment variables, or built directly in code (tests do this to avoid
//! touching the process environment).

mod client;

pub use client::{ClientConfig, WorkloadIdentityEnv};

/// Load configuration from environment variables with defaults
pub fn load_config() -> ClientConfig {
    ClientConfig::from_env()
}
