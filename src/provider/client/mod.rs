//! # Secret Manager Client
//!
//! The narrow capability interface the provider components depend on.
//!
//! - [`SecretManagerRest`]: native REST implementation using reqwest with rustls
//! - [`InMemorySecretManager`]: deterministic double for tests, no network I/O
//! - [`Cancellable`]: races every call of an inner client against a cancellation token

mod iterator;
mod memory;
pub mod rest;

pub use iterator::SecretIterator;
pub use memory::{InMemorySecretManager, MemoryCalls, MemoryOperation};
pub use rest::SecretManagerRest;

use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A secret version as returned by an access call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    /// Full version resource name
    pub name: String,
    /// Payload bytes; `None` when the remote returned no payload
    pub payload: Option<Vec<u8>>,
}

/// A secret resource without its versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSecret {
    /// Full resource name, `accounts/{alias}/secrets/{key}`
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Listing parameters shared by every page of one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSecretsRequest {
    /// `accounts/{account}`
    pub parent: String,
    pub filter: Option<String>,
    pub page_size: u32,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListSecretsPage {
    pub secrets: Vec<RemoteSecret>,
    pub next_page_token: Option<String>,
    pub total_size: Option<u32>,
}

/// Remote secret store operations
#[async_trait]
pub trait SecretManagerClient: Send + Sync + fmt::Debug {
    /// Read one version, `NotFound` when the secret or version is absent
    async fn access_secret_version(&self, name: &str) -> Result<SecretVersion>;

    /// Read secret metadata, `NotFound` when absent
    async fn get_secret(&self, name: &str) -> Result<RemoteSecret>;

    /// Create a secret with automatic replication
    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<RemoteSecret>;

    /// Append a version to an existing secret
    async fn add_secret_version(&self, parent: &str, payload: &[u8]) -> Result<SecretVersion>;

    /// Fetch one page of a listing; `page_token` is `None` for the first page
    async fn list_secrets_page(
        &self,
        request: &ListSecretsRequest,
        page_token: Option<&str>,
    ) -> Result<ListSecretsPage>;

    /// Release transport resources
    async fn close(&self) -> Result<()>;
}

/// Paginated listing over any client
pub fn list_secrets(
    client: &dyn SecretManagerClient,
    request: ListSecretsRequest,
) -> SecretIterator<'_> {
    SecretIterator::new(client, request)
}

/// Run `operation` unless `cancel` fires first
pub async fn guard<T, F>(cancel: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = operation => result,
    }
}

/// Client wrapper that aborts in-flight calls on cancellation
#[derive(Debug, Clone)]
pub struct Cancellable {
    inner: Arc<dyn SecretManagerClient>,
    cancel: CancellationToken,
}

impl Cancellable {
    pub fn new(inner: Arc<dyn SecretManagerClient>, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[async_trait]
impl SecretManagerClient for Cancellable {
    async fn access_secret_version(&self, name: &str) -> Result<SecretVersion> {
        guard(&self.cancel, self.inner.access_secret_version(name)).await
    }

    async fn get_secret(&self, name: &str) -> Result<RemoteSecret> {
        guard(&self.cancel, self.inner.get_secret(name)).await
    }

    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<RemoteSecret> {
        guard(&self.cancel, self.inner.create_secret(parent, secret_id, labels)).await
    }

    async fn add_secret_version(&self, parent: &str, payload: &[u8]) -> Result<SecretVersion> {
        guard(&self.cancel, self.inner.add_secret_version(parent, payload)).await
    }

    async fn list_secrets_page(
        &self,
        request: &ListSecretsRequest,
        page_token: Option<&str>,
    ) -> Result<ListSecretsPage> {
        guard(
            &self.cancel,
            self.inner.list_secrets_page(request, page_token),
        )
        .await
    }

    // Close runs even after cancellation so transport resources are released
    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
