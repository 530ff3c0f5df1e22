//! # Secret Manager Provider
//!
//! Connects a Kubernetes secret controller to a remote Secret Manager service.
//!
//! ## Overview
//!
//! The provider:
//!
//! 1. **Resolves credentials** - service account key in a Kubernetes secret, workload identity token exchange, or ambient credentials
//! 2. **Reads secrets** - single versions, JSON properties (flat or nested), or whole payloads exploded into maps
//! 3. **Discovers secrets** - by name pattern or by labels, with path prefix filtering
//! 4. **Pushes secrets** - idempotently, and only into secrets it owns
//!
//! At most one provider instance is live per process by default. Construction
//! blocks until the previous instance is closed.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use secretmanager_provider::crd::{RemoteSecretRef, SecretStore};
//! use secretmanager_provider::provider::SecretManagerProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(store: SecretStore) -> anyhow::Result<()> {
//! let provider = SecretManagerProvider::from_env()?;
//! let kube = Arc::new(kube::Client::try_default().await?);
//! let mut client = provider
//!     .new_client(CancellationToken::new(), &store, kube, "team-a")
//!     .await?;
//! let password = client
//!     .get_secret(&RemoteSecretRef::new("db/creds").with_property("password"))
//!     .await;
//! client.close().await?;
//! # let _ = password;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod kubernetes;
pub mod observability;
pub mod provider;
pub mod runtime;

pub use errors::{ProviderError, Result};
pub use provider::{Capabilities, SecretManagerProvider, SecretsClient, ValidationResult};
