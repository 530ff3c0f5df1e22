//! # Secret Manager Provider
//!
//! Factory and instance surface consumed by a secret controller.
//!
//! ```text
//! SecretManagerProvider::new_client(cancel, store, kube, namespace)
//!   ├─ acquire ClientLease (single-flight, process-wide by default)
//!   ├─ CredentialResolver: secretRef → workloadIdentity → ambient
//!   ├─ eager token fetch (validates the credentials)
//!   └─ ClientConnector builds the transport
//!
//! SecretsClient
//!   ├─ get_secret / get_secret_map   (SecretAccessor)
//!   ├─ get_all_secrets               (SecretFinder)
//!   ├─ set_secret                    (SecretWriter)
//!   └─ close                         (releases transport and lease)
//! ```
//!
//! Every construction error after the lease was taken drops the lease handle,
//! so the slot is always released.

pub mod accessor;
pub mod client;
pub mod finder;
pub mod validation;
pub mod writer;

pub use accessor::SecretAccessor;
pub use client::{
    Cancellable, InMemorySecretManager, ListSecretsPage, ListSecretsRequest, RemoteSecret,
    SecretIterator, SecretManagerClient, SecretManagerRest, SecretVersion,
};
pub use finder::{FindMode, IdentityKeys, KeyConverter, SecretFinder};
pub use validation::validate_store;
pub use writer::SecretWriter;

use crate::auth::{
    AmbientCredentialProvider, CredentialResolver, CredentialStrategy, DefaultCredentials,
    ResolveContext, TokenSource,
};
use crate::config::ClientConfig;
use crate::crd::{FindQuery, PushRef, RemoteSecretRef, SecretMap, SecretStore};
use crate::errors::{ProviderError, Result};
use crate::kubernetes::KubeReader;
use crate::observability::metrics;
use crate::runtime::{ClientLease, LeaseHandle};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{field::Empty, info, info_span, Instrument, Span};

/// What a provider instance can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capabilities {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Result of an instance self-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Ready,
    Unknown,
    Error,
}

/// Builds the transport once credentials are resolved
#[async_trait]
pub trait ClientConnector: Send + Sync + fmt::Debug {
    async fn connect(
        &self,
        config: &ClientConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Arc<dyn SecretManagerClient>>;
}

/// Connects to the Secret Manager REST endpoint from the configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct RestConnector;

#[async_trait]
impl ClientConnector for RestConnector {
    async fn connect(
        &self,
        config: &ClientConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Arc<dyn SecretManagerClient>> {
        Ok(Arc::new(SecretManagerRest::new(&config.endpoint, http, tokens)))
    }
}

/// Hands out one pre-built client; credentials are still resolved and validated
#[derive(Debug, Clone)]
pub struct StaticConnector {
    client: Arc<dyn SecretManagerClient>,
}

impl StaticConnector {
    pub fn new(client: Arc<dyn SecretManagerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClientConnector for StaticConnector {
    async fn connect(
        &self,
        _config: &ClientConfig,
        _http: reqwest::Client,
        _tokens: Arc<dyn TokenSource>,
    ) -> Result<Arc<dyn SecretManagerClient>> {
        Ok(Arc::clone(&self.client))
    }
}

/// Provider factory
#[derive(Debug, Clone)]
pub struct SecretManagerProvider {
    config: ClientConfig,
    http: reqwest::Client,
    lease: ClientLease,
    resolver: CredentialResolver,
    connector: Arc<dyn ClientConnector>,
    ambient: Arc<dyn AmbientCredentialProvider>,
}

impl SecretManagerProvider {
    /// Provider using the process-wide lease, the REST transport and default
    /// ambient credentials
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = client::rest::build_http_client(config.request_timeout_secs)?;
        let ambient = Arc::new(DefaultCredentials::new(&config, http.clone()));
        Ok(Self {
            config,
            http,
            lease: ClientLease::process_wide(),
            resolver: CredentialResolver::new(),
            connector: Arc::new(RestConnector),
            ambient,
        })
    }

    /// Provider configured from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(crate::config::load_config())
    }

    #[must_use]
    pub fn with_lease(mut self, lease: ClientLease) -> Self {
        self.lease = lease;
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn ClientConnector>) -> Self {
        self.connector = connector;
        self
    }

    #[must_use]
    pub fn with_ambient(mut self, ambient: Arc<dyn AmbientCredentialProvider>) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn lease(&self) -> &ClientLease {
        &self.lease
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::ReadWrite
    }

    pub fn validate_store(&self, store: &SecretStore) -> Result<()> {
        validate_store(store)
    }

    /// Build a provider instance for `store`, acting on behalf of `namespace`.
    ///
    /// Blocks until the lease is free. The returned instance holds the lease
    /// until [`SecretsClient::close`] runs or the instance is dropped.
    pub async fn new_client(
        &self,
        cancel: CancellationToken,
        store: &SecretStore,
        kube: Arc<dyn KubeReader>,
        namespace: &str,
    ) -> Result<SecretsClient> {
        let span = info_span!(
            "secretmanager.client.new",
            store.name = %store.name,
            namespace = %namespace,
            account.id = Empty,
            credentials.strategy = Empty,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        );
        let span_clone = span.clone();
        instrumented(span, "client.new", async move {
            let spec = store.secret_manager().ok_or_else(|| {
                ProviderError::Config("store is missing secret manager provider".to_string())
            })?;
            span_clone.record("account.id", spec.account_id.as_str());

            let lease = self.lease.acquire(&cancel).await?;

            let ctx = ResolveContext {
                kind: store.kind,
                spec,
                namespace,
                kube,
                ambient: self.ambient.as_ref(),
                config: &self.config,
                http: self.http.clone(),
            };
            let resolved = client::guard(&cancel, self.resolver.resolve(&ctx)).await?;
            span_clone.record("credentials.strategy", resolved.strategy.as_str());

            client::guard(&cancel, resolved.source.token())
                .await
                .map_err(|e| match e {
                    ProviderError::Auth(_) | ProviderError::Cancelled => e,
                    other => ProviderError::Auth(other.to_string()),
                })?;

            let transport = self
                .connector
                .connect(&self.config, self.http.clone(), Arc::clone(&resolved.source))
                .await?;

            info!(
                account.id = %spec.account_id,
                strategy = %resolved.strategy,
                "Secret Manager client ready"
            );
            Ok(SecretsClient {
                account_id: spec.account_id.clone(),
                client: Some(Cancellable::new(transport, cancel)),
                lease: Some(lease),
                strategy: resolved.strategy,
                page_size: self.config.list_page_size,
            })
        })
        .await
    }
}

/// A live provider instance
///
/// Dropping the instance without calling [`close`](Self::close) still frees
/// the lease, but skips closing the transport.
#[derive(Debug)]
pub struct SecretsClient {
    account_id: String,
    client: Option<Cancellable>,
    lease: Option<LeaseHandle>,
    strategy: CredentialStrategy,
    page_size: u32,
}

impl SecretsClient {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Strategy that produced this instance's credentials
    pub fn strategy(&self) -> CredentialStrategy {
        self.strategy
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::ReadWrite
    }

    pub fn validate(&self) -> ValidationResult {
        ValidationResult::Ready
    }

    pub fn validate_store(&self, store: &SecretStore) -> Result<()> {
        validate_store(store)
    }

    fn transport(&self) -> Option<&dyn SecretManagerClient> {
        self.client
            .as_ref()
            .map(|client| client as &dyn SecretManagerClient)
    }

    fn accessor(&self) -> Result<SecretAccessor<'_>> {
        SecretAccessor::new(self.transport(), &self.account_id)
    }

    /// Payload of one secret version, optionally narrowed to a property
    pub async fn get_secret(&self, reference: &RemoteSecretRef) -> Result<Vec<u8>> {
        let span = operation_span("secretmanager.secret.get", &reference.key, &self.account_id);
        instrumented(span, "get", async {
            self.accessor()?.get_secret(reference).await
        })
        .await
    }

    /// Payload of one secret version exploded into a map
    pub async fn get_secret_map(&self, reference: &RemoteSecretRef) -> Result<SecretMap> {
        let span = operation_span("secretmanager.secret.get_map", &reference.key, &self.account_id);
        instrumented(span, "get_map", async {
            self.accessor()?.get_secret_map(reference).await
        })
        .await
    }

    /// Every secret matching `query`, keys rewritten by `converter`
    pub async fn get_all_secrets(
        &self,
        query: &FindQuery,
        converter: &dyn KeyConverter,
    ) -> Result<SecretMap> {
        let (name, operation) = match FindMode::of(query) {
            Ok(FindMode::ByTags) => ("secretmanager.secret.find_by_tags", "find_by_tags"),
            _ => ("secretmanager.secret.find_by_name", "find_by_name"),
        };
        let target = query
            .path
            .as_deref()
            .or_else(|| query.name.as_ref().map(|n| n.regexp.as_str()))
            .unwrap_or_default();
        let span = operation_span(name, target, &self.account_id);
        let span_clone = span.clone();
        instrumented(span, operation, async move {
            let found = SecretFinder::new(self.accessor()?, self.page_size)
                .get_all_secrets(query, converter)
                .await?;
            span_clone.record("secrets.found", found.len());
            Ok(found)
        })
        .await
    }

    /// Idempotent, ownership-checked push; `true` when a version was written
    pub async fn set_secret(&self, payload: &[u8], push: &PushRef) -> Result<bool> {
        let span = operation_span("secretmanager.secret.push", &push.remote_key, &self.account_id);
        instrumented(span, "push", async {
            SecretWriter::new(self.transport(), &self.account_id)?
                .set_secret(payload, push)
                .await
        })
        .await
    }

    /// Close the transport and release the lease. Later calls are no-ops.
    pub async fn close(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        let lease = self.lease.take();
        let span = info_span!(
            "secretmanager.client.close",
            account.id = %self.account_id,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        );
        let result = instrumented(span, "client.close", client.close()).await;
        drop(lease);
        result
    }
}

fn operation_span(name: &'static str, target: &str, account_id: &str) -> Span {
    // Span names must be static, so each operation spells out its own
    match name {
        "secretmanager.secret.get_map" => info_span!(
            "secretmanager.secret.get_map",
            secret.name = %target,
            account.id = %account_id,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        ),
        "secretmanager.secret.find_by_name" => info_span!(
            "secretmanager.secret.find_by_name",
            secret.name = %target,
            account.id = %account_id,
            secrets.found = Empty,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        ),
        "secretmanager.secret.find_by_tags" => info_span!(
            "secretmanager.secret.find_by_tags",
            secret.name = %target,
            account.id = %account_id,
            secrets.found = Empty,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        ),
        "secretmanager.secret.push" => info_span!(
            "secretmanager.secret.push",
            secret.name = %target,
            account.id = %account_id,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        ),
        _ => info_span!(
            "secretmanager.secret.get",
            secret.name = %target,
            account.id = %account_id,
            operation.success = Empty,
            operation.duration_ms = Empty,
            error.reason = Empty,
        ),
    }
}

/// Run `operation` inside `span`, recording outcome and duration on the span
/// and in the metrics
async fn instrumented<T, F>(span: Span, metric: &'static str, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let span_clone = span.clone();
    let start = Instant::now();
    let result = operation.instrument(span).await;
    span_clone.record(
        "operation.duration_ms",
        u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    );
    span_clone.record("operation.success", result.is_ok());
    if let Err(e) = &result {
        span_clone.record("error.reason", e.reason());
    }
    metrics::record_operation(metric, start, &result);
    result
}
