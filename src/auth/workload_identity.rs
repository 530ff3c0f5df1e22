//! # Workload Identity
//!
//! Exchanges a projected Kubernetes service account token for a short-lived
//! platform credential (`client_credentials` grant with a federated client
//! assertion).
//!
//! The client and tenant ids come either from annotations on a referenced
//! service account, or from the environment injected by the workload
//! identity webhook when no reference is configured.

use super::token::{read_token_response, AccessToken, TokenFetcher};
use crate::config::WorkloadIdentityEnv;
use crate::constants::{
    ANNOTATION_CLIENT_ID, ANNOTATION_TENANT_ID, CLIENT_ASSERTION_TYPE, DEFAULT_TOKEN_AUDIENCE,
    ENV_CLIENT_ID, ENV_FEDERATED_TOKEN_FILE, ENV_TENANT_ID,
};
use crate::errors::{ProviderError, Result};
use crate::kubernetes::KubeReader;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Where the federated client assertion comes from
enum AssertionSource {
    /// Requested from the TokenRequest API on every exchange
    ServiceAccount {
        kube: Arc<dyn KubeReader>,
        namespace: String,
        name: String,
        audiences: Vec<String>,
    },
    /// Projected token file mounted into the controller pod
    File(PathBuf),
}

impl fmt::Debug for AssertionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceAccount {
                namespace, name, ..
            } => f
                .debug_struct("ServiceAccount")
                .field("namespace", namespace)
                .field("name", name)
                .finish_non_exhaustive(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl AssertionSource {
    async fn read(&self) -> Result<Zeroizing<String>> {
        match self {
            Self::ServiceAccount {
                kube,
                namespace,
                name,
                audiences,
            } => kube
                .service_account_token(namespace, name, audiences)
                .await
                .map(Zeroizing::new)
                .map_err(|e| match e {
                    ProviderError::Cancelled => e,
                    other => ProviderError::Auth(format!(
                        "unable to fetch token for serviceaccount {namespace}/{name}: {other}"
                    )),
                }),
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map(|token| Zeroizing::new(token.trim().to_string()))
                .map_err(|e| {
                    ProviderError::Auth(format!(
                        "unable to read token file {}: {e}",
                        path.display()
                    ))
                }),
        }
    }
}

/// Federated token exchange for one client/tenant pair
#[derive(Debug)]
pub struct FederatedTokenFetcher {
    assertion: AssertionSource,
    client_id: String,
    tenant_id: String,
    scope: String,
    token_endpoint: String,
    http: reqwest::Client,
}

/// Token endpoint for a tenant under an authority host
pub fn token_endpoint(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{tenant_id}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/')
    )
}

impl FederatedTokenFetcher {
    /// Build a fetcher from a referenced service account's annotations
    pub async fn from_service_account(
        kube: Arc<dyn KubeReader>,
        namespace: &str,
        name: &str,
        extra_audiences: &[String],
        scope: &str,
        authority_host: &str,
        http: reqwest::Client,
    ) -> Result<Self> {
        let annotations = kube
            .service_account_annotations(namespace, name)
            .await
            .map_err(|e| match e {
                ProviderError::Cancelled => e,
                other => ProviderError::Auth(format!(
                    "unable to read serviceaccount {namespace}/{name}: {other}"
                )),
            })?;
        let annotation = |key: &str| {
            annotations.get(key).cloned().ok_or_else(|| {
                ProviderError::Config(format!(
                    "serviceaccount {namespace}/{name} is missing annotation: {key}"
                ))
            })
        };
        let client_id = annotation(ANNOTATION_CLIENT_ID)?;
        let tenant_id = annotation(ANNOTATION_TENANT_ID)?;

        let mut audiences = vec![DEFAULT_TOKEN_AUDIENCE.to_string()];
        audiences.extend(extra_audiences.iter().cloned());

        debug!(
            serviceaccount = %format!("{namespace}/{name}"),
            client_id = %client_id,
            "Using service account annotations for workload identity"
        );
        Ok(Self {
            assertion: AssertionSource::ServiceAccount {
                kube,
                namespace: namespace.to_string(),
                name: name.to_string(),
                audiences,
            },
            token_endpoint: token_endpoint(authority_host, &tenant_id),
            client_id,
            tenant_id,
            scope: scope.to_string(),
            http,
        })
    }

    /// Build a fetcher from the webhook-injected environment.
    ///
    /// All three inputs are required; a missing one is a configuration error.
    pub fn from_env(
        env: &WorkloadIdentityEnv,
        scope: &str,
        authority_host: &str,
        http: reqwest::Client,
    ) -> Result<Self> {
        let missing: Vec<&str> = [
            (ENV_CLIENT_ID, env.client_id.is_none()),
            (ENV_TENANT_ID, env.tenant_id.is_none()),
            (ENV_FEDERATED_TOKEN_FILE, env.federated_token_file.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        let (Some(client_id), Some(tenant_id), Some(token_file)) = (
            env.client_id.clone(),
            env.tenant_id.clone(),
            env.federated_token_file.clone(),
        ) else {
            return Err(ProviderError::Config(format!(
                "missing workload identity environment variables: {}",
                missing.join(", ")
            )));
        };
        Ok(Self {
            assertion: AssertionSource::File(PathBuf::from(token_file)),
            token_endpoint: token_endpoint(authority_host, &tenant_id),
            client_id,
            tenant_id,
            scope: scope.to_string(),
            http,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

#[async_trait]
impl TokenFetcher for FederatedTokenFetcher {
    async fn fetch(&self) -> Result<AccessToken> {
        let assertion = self.assertion.read().await?;
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
                ("grant_type", "client_credentials"),
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Auth(format!("token exchange failed: {e}")))?;
        read_token_response(response, &self.token_endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::InMemoryKube;

    #[test]
    fn test_token_endpoint_trims_trailing_slash() {
        assert_eq!(
            token_endpoint("https://login.example.com/", "t1"),
            "https://login.example.com/t1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_from_env_reports_every_missing_variable() {
        let env = WorkloadIdentityEnv {
            client_id: Some("c1".to_string()),
            ..Default::default()
        };
        let err = FederatedTokenFetcher::from_env(&env, "scope", "https://login", reqwest::Client::new())
            .expect_err("incomplete env");
        assert!(matches!(err, ProviderError::Config(_)));
        let message = err.to_string();
        assert!(message.contains(ENV_TENANT_ID));
        assert!(message.contains(ENV_FEDERATED_TOKEN_FILE));
        assert!(!message.contains(ENV_CLIENT_ID));
    }

    #[tokio::test]
    async fn test_missing_annotation_is_config_error() {
        let kube = Arc::new(InMemoryKube::new().with_service_account(
            "ns",
            "sa",
            [(ANNOTATION_CLIENT_ID, "c1")],
        ));
        let err = FederatedTokenFetcher::from_service_account(
            kube,
            "ns",
            "sa",
            &[],
            "scope",
            "https://login",
            reqwest::Client::new(),
        )
        .await
        .expect_err("tenant annotation missing");
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(err.to_string().contains(ANNOTATION_TENANT_ID));
    }

    #[tokio::test]
    async fn test_annotations_select_client_and_tenant() {
        let kube = Arc::new(InMemoryKube::new().with_service_account(
            "ns",
            "sa",
            [(ANNOTATION_CLIENT_ID, "c1"), (ANNOTATION_TENANT_ID, "t1")],
        ));
        let fetcher = FederatedTokenFetcher::from_service_account(
            kube,
            "ns",
            "sa",
            &["extra".to_string()],
            "scope",
            "https://login",
            reqwest::Client::new(),
        )
        .await
        .expect("fetcher");
        assert_eq!(fetcher.client_id(), "c1");
        assert_eq!(fetcher.tenant_id(), "t1");
        assert_eq!(fetcher.token_endpoint, "https://login/t1/oauth2/v2.0/token");
        match &fetcher.assertion {
            AssertionSource::ServiceAccount { audiences, .. } => {
                assert_eq!(audiences, &vec![DEFAULT_TOKEN_AUDIENCE.to_string(), "extra".to_string()]);
            }
            AssertionSource::File(_) => panic!("expected service account assertion"),
        }
    }
}
