//! # Credential Resolution
//!
//! Produces the token source that authenticates every remote call of a
//! provider instance.
//!
//! Strategies are evaluated in a fixed order:
//!
//! 1. [`CredentialStrategy::SecretRef`]: service account JSON stored in a Kubernetes secret
//! 2. [`CredentialStrategy::WorkloadIdentity`]: projected service account token exchange
//! 3. [`CredentialStrategy::Ambient`]: the environment's implicit credentials
//!
//! A strategy that is not configured yields `Ok(None)` and the next one is
//! tried. A configured strategy that fails stops the chain with its error.

mod ambient;
mod service_account;
mod token;
mod workload_identity;

pub use ambient::{AmbientCredentialProvider, DefaultCredentials, MetadataServerFetcher};
pub use service_account::{ServiceAccountCredentials, ServiceAccountFetcher};
pub use token::{AccessToken, CachedTokenSource, TokenFetcher, TokenSource};
pub use workload_identity::{token_endpoint, FederatedTokenFetcher};

use crate::config::ClientConfig;
use crate::constants::CLOUD_PLATFORM_SCOPE;
use crate::crd::{SecretManagerSpec, StoreKind};
use crate::errors::{ProviderError, Result};
use crate::kubernetes::KubeReader;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a strategy may consult while resolving
pub struct ResolveContext<'a> {
    pub kind: StoreKind,
    pub spec: &'a SecretManagerSpec,
    /// Namespace of the caller (the object being reconciled)
    pub namespace: &'a str,
    pub kube: Arc<dyn KubeReader>,
    pub ambient: &'a dyn AmbientCredentialProvider,
    pub config: &'a ClientConfig,
    pub http: reqwest::Client,
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("kind", &self.kind)
            .field("account_id", &self.spec.account_id)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// One entry of the credential chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStrategy {
    SecretRef,
    WorkloadIdentity,
    Ambient,
}

impl CredentialStrategy {
    /// Default evaluation order
    pub const CHAIN: [Self; 3] = [Self::SecretRef, Self::WorkloadIdentity, Self::Ambient];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecretRef => "secret_ref",
            Self::WorkloadIdentity => "workload_identity",
            Self::Ambient => "ambient",
        }
    }

    /// Resolve a token source, or `None` when this strategy is not configured
    pub async fn try_resolve(
        self,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<Arc<dyn TokenSource>>> {
        match self {
            Self::SecretRef => from_secret_ref(ctx).await,
            Self::WorkloadIdentity => from_workload_identity(ctx).await,
            Self::Ambient => ctx
                .ambient
                .token_source(CLOUD_PLATFORM_SCOPE)
                .await
                .map(Some),
        }
    }
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token source together with the strategy that produced it
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub strategy: CredentialStrategy,
    pub source: Arc<dyn TokenSource>,
}

/// Ordered credential strategy chain
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    strategies: Vec<CredentialStrategy>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self {
            strategies: CredentialStrategy::CHAIN.to_vec(),
        }
    }
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom chain, evaluated in the given order
    pub fn with_strategies(strategies: impl IntoIterator<Item = CredentialStrategy>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    pub fn strategies(&self) -> &[CredentialStrategy] {
        &self.strategies
    }

    /// Walk the chain until a strategy yields a token source or fails
    pub async fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<ResolvedCredentials> {
        for strategy in &self.strategies {
            debug!(strategy = %strategy, "Trying credential strategy");
            if let Some(source) = strategy.try_resolve(ctx).await? {
                info!(
                    strategy = %strategy,
                    account.id = %ctx.spec.account_id,
                    "Resolved credentials"
                );
                return Ok(ResolvedCredentials {
                    strategy: *strategy,
                    source,
                });
            }
        }
        Err(ProviderError::Auth(
            "no credential strategy is applicable".to_string(),
        ))
    }
}

/// Namespace a credential selector points into.
///
/// Cluster-scoped stores must name the namespace explicitly; namespaced
/// stores always read from the caller's namespace.
pub(crate) fn selector_namespace(
    kind: StoreKind,
    selector_namespace: Option<&str>,
    caller_namespace: &str,
    what: &str,
) -> Result<String> {
    if kind.is_cluster_scoped() {
        return selector_namespace
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Config(format!("missing {what} Namespace")));
    }
    Ok(caller_namespace.to_string())
}

async fn from_secret_ref(ctx: &ResolveContext<'_>) -> Result<Option<Arc<dyn TokenSource>>> {
    let Some(secret_ref) = &ctx.spec.auth.secret_ref else {
        return Ok(None);
    };
    let selector = &secret_ref.secret_access_key;
    if selector.name.is_empty() || selector.key.is_empty() {
        return Err(ProviderError::Config("missing SecretAccessKey".to_string()));
    }
    let namespace = selector_namespace(
        ctx.kind,
        selector.namespace.as_deref(),
        ctx.namespace,
        "SecretAccessKey",
    )?;
    let data = ctx
        .kube
        .secret_data(&namespace, &selector.name)
        .await
        .map_err(|e| match e {
            ProviderError::Cancelled => e,
            other => ProviderError::Auth(format!(
                "cannot get Kubernetes secret {namespace}/{}: {other}",
                selector.name
            )),
        })?;
    let blob = data
        .get(&selector.key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ProviderError::Config("missing SecretAccessKey".to_string()))?;
    let credentials = ServiceAccountCredentials::from_json(blob)?;
    debug!(
        client_email = %credentials.client_email(),
        secret = %format!("{namespace}/{}", selector.name),
        "Loaded service account key from secret"
    );
    let fetcher = ServiceAccountFetcher::new(credentials, CLOUD_PLATFORM_SCOPE, ctx.http.clone());
    Ok(Some(Arc::new(CachedTokenSource::new(
        fetcher,
        ctx.config.token_expiry_skew_secs,
    ))))
}

async fn from_workload_identity(
    ctx: &ResolveContext<'_>,
) -> Result<Option<Arc<dyn TokenSource>>> {
    let Some(workload_identity) = &ctx.spec.auth.workload_identity else {
        return Ok(None);
    };
    let scope = workload_identity
        .scope
        .as_deref()
        .unwrap_or(CLOUD_PLATFORM_SCOPE);
    let fetcher = match &workload_identity.service_account_ref {
        Some(selector) => {
            if selector.name.is_empty() {
                return Err(ProviderError::Config(
                    "missing ServiceAccountRef name".to_string(),
                ));
            }
            let namespace = selector_namespace(
                ctx.kind,
                selector.namespace.as_deref(),
                ctx.namespace,
                "ServiceAccountRef",
            )?;
            FederatedTokenFetcher::from_service_account(
                Arc::clone(&ctx.kube),
                &namespace,
                &selector.name,
                &selector.audiences,
                scope,
                &ctx.config.authority_host,
                ctx.http.clone(),
            )
            .await?
        }
        None => FederatedTokenFetcher::from_env(
            &ctx.config.workload_identity,
            scope,
            &ctx.config.authority_host,
            ctx.http.clone(),
        )?,
    };
    Ok(Some(Arc::new(CachedTokenSource::new(
        fetcher,
        ctx.config.token_expiry_skew_secs,
    ))))
}
