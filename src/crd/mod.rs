//! # Store and Reference Types
//!
//! Configuration and addressing types shared by the provider components.
//!
//! These types contain no behavior beyond small accessors; the provider
//! modules interpret them.

mod refs;
mod store;

pub use refs::{FindName, FindQuery, PushRef, RemoteSecretRef, SecretMap};
pub use store::{
    ProviderSpec, SecretKeySelector, SecretManagerAuth, SecretManagerSpec, SecretRefAuth,
    SecretStore, ServiceAccountSelector, StoreKind, StoreSpec, WorkloadIdentityAuth,
};
