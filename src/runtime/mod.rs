//! # Runtime Module
//!
//! Process-level runtime components shared by provider instances.

pub mod lease;

pub use lease::{ClientLease, LeaseHandle};
