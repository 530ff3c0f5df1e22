//! # Kubernetes Read Capability
//!
//! The narrow slice of the Kubernetes API the credential chain needs:
//! reading secret data, reading service account annotations and requesting
//! projected service account tokens.
//!
//! `kube::Client` implements [`KubeReader`]; [`InMemoryKube`] serves the same
//! contract from memory for tests.

use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::api::PostParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Read access to namespaced Kubernetes objects
#[async_trait]
pub trait KubeReader: Send + Sync {
    /// Data of a secret, `NotFound` when the secret does not exist
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>>;

    /// Annotations of a service account, `NotFound` when it does not exist
    async fn service_account_annotations(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>>;

    /// Request a projected token for a service account
    async fn service_account_token(
        &self,
        namespace: &str,
        name: &str,
        audiences: &[String],
    ) -> Result<String>;
}

fn map_kube_error(kind: &str, namespace: &str, name: &str, e: kube::Error) -> ProviderError {
    match e {
        kube::Error::Api(api_err) if api_err.code == 404 => {
            ProviderError::NotFound(format!("{kind} {namespace}/{name}"))
        }
        other => ProviderError::transport(format!("failed to read {kind} {namespace}/{name}: {other}")),
    }
}

#[async_trait]
impl KubeReader for Client {
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let secrets: Api<Secret> = Api::namespaced(self.clone(), namespace);
        let secret = secrets
            .get(name)
            .await
            .map_err(|e| map_kube_error("secret", namespace, name, e))?;
        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }

    async fn service_account_annotations(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.clone(), namespace);
        let account = accounts
            .get(name)
            .await
            .map_err(|e| map_kube_error("serviceaccount", namespace, name, e))?;
        Ok(account.metadata.annotations.unwrap_or_default())
    }

    async fn service_account_token(
        &self,
        namespace: &str,
        name: &str,
        audiences: &[String],
    ) -> Result<String> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.clone(), namespace);
        let request = TokenRequest {
            spec: TokenRequestSpec {
                audiences: audiences.to_vec(),
                ..Default::default()
            },
            ..Default::default()
        };
        let response = accounts
            .create_token_request(name, &PostParams::default(), &request)
            .await
            .map_err(|e| map_kube_error("serviceaccount token", namespace, name, e))?;
        response
            .status
            .map(|status| status.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ProviderError::Auth(format!(
                    "token request for serviceaccount {namespace}/{name} returned no token"
                ))
            })
    }
}

#[derive(Debug, Default)]
struct InMemoryObjects {
    secrets: BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>,
    service_accounts: BTreeMap<(String, String), BTreeMap<String, String>>,
    token_requests: Vec<(String, String, Vec<String>)>,
}

/// In-memory [`KubeReader`] used by tests
///
/// Issued tokens are `token-for-{namespace}/{name}`.
#[derive(Debug, Default)]
pub struct InMemoryKube {
    objects: Mutex<InMemoryObjects>,
}

impl InMemoryKube {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret<K, V>(
        self,
        namespace: &str,
        name: &str,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        if let Ok(mut objects) = self.objects.lock() {
            objects.secrets.insert(
                (namespace.to_string(), name.to_string()),
                data.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            );
        }
        self
    }

    #[must_use]
    pub fn with_service_account<K, V>(
        self,
        namespace: &str,
        name: &str,
        annotations: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        if let Ok(mut objects) = self.objects.lock() {
            objects.service_accounts.insert(
                (namespace.to_string(), name.to_string()),
                annotations
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            );
        }
        self
    }

    /// Token requests issued so far as `(namespace, name, audiences)`
    pub fn token_requests(&self) -> Vec<(String, String, Vec<String>)> {
        self.objects
            .lock()
            .map(|objects| objects.token_requests.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryObjects>> {
        self.objects
            .lock()
            .map_err(|e| ProviderError::transport(format!("in-memory kube poisoned: {e}")))
    }
}

#[async_trait]
impl KubeReader for InMemoryKube {
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        self.lock()?
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("secret {namespace}/{name}")))
    }

    async fn service_account_annotations(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.lock()?
            .service_accounts
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("serviceaccount {namespace}/{name}")))
    }

    async fn service_account_token(
        &self,
        namespace: &str,
        name: &str,
        audiences: &[String],
    ) -> Result<String> {
        let mut objects = self.lock()?;
        if !objects
            .service_accounts
            .contains_key(&(namespace.to_string(), name.to_string()))
        {
            return Err(ProviderError::NotFound(format!(
                "serviceaccount {namespace}/{name}"
            )));
        }
        objects
            .token_requests
            .push((namespace.to_string(), name.to_string(), audiences.to_vec()));
        Ok(format!("token-for-{namespace}/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_secret_lookup() {
        let kube = InMemoryKube::new().with_secret("ns", "creds", [("key", "value")]);
        let data = kube.secret_data("ns", "creds").await.expect("secret exists");
        assert_eq!(data.get("key").map(Vec::as_slice), Some(b"value".as_slice()));

        let err = kube.secret_data("other", "creds").await.expect_err("wrong namespace");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_in_memory_token_requests_are_recorded() {
        let kube = InMemoryKube::new().with_service_account("ns", "sa", [("a", "b")]);
        let token = kube
            .service_account_token("ns", "sa", &["aud".to_string()])
            .await
            .expect("token");
        assert_eq!(token, "token-for-ns/sa");
        assert_eq!(
            kube.token_requests(),
            vec![("ns".to_string(), "sa".to_string(), vec!["aud".to_string()])]
        );
    }
}
