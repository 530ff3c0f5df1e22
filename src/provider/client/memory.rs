//! # In-Memory Secret Manager
//!
//! A [`SecretManagerClient`] backed by a map, with the same naming, filtering
//! and pagination rules as the REST API. Used by unit and integration tests.

use super::{ListSecretsPage, ListSecretsRequest, RemoteSecret, SecretManagerClient, SecretVersion};
use crate::constants::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use paths::{ListFilter, LATEST_VERSION};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Operations of the in-memory store, for failure injection and call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryOperation {
    Access,
    Get,
    Create,
    AddVersion,
    List,
}

/// Calls served so far, per operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCalls {
    pub access: usize,
    pub get: usize,
    pub create: usize,
    pub add_version: usize,
    pub list_pages: usize,
}

#[derive(Debug, Clone, Default)]
struct StoredSecret {
    labels: BTreeMap<String, String>,
    versions: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, StoredSecret>,
    calls: MemoryCalls,
    failures: BTreeMap<MemoryOperation, u16>,
    filters: Vec<Option<String>>,
}

/// In-memory remote store for a single account
///
/// Listing returns resource names under `alias` when one is set, mirroring
/// the numeric project number the real API reports.
#[derive(Debug)]
pub struct InMemorySecretManager {
    account: String,
    alias: Option<String>,
    page_size: usize,
    ignore_name_filter: bool,
    latency: Option<Duration>,
    state: Mutex<State>,
    closed: AtomicBool,
}

impl InMemorySecretManager {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            alias: None,
            page_size: usize::MAX,
            ignore_name_filter: false,
            latency: None,
            state: Mutex::new(State::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Report listed names under `alias` instead of the account id
    #[must_use]
    pub fn with_account_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Cap every listing page at `page_size` entries
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Treat `name:` clauses as always matching, like a server with a looser
    /// name filter than substring containment
    #[must_use]
    pub fn ignoring_name_filter(mut self) -> Self {
        self.ignore_name_filter = true;
        self
    }

    /// Delay every call, for cancellation tests
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert a secret with the given labels and versions (oldest first)
    #[must_use]
    pub fn with_secret<K, V>(
        self,
        key: &str,
        labels: impl IntoIterator<Item = (K, V)>,
        versions: impl IntoIterator<Item = Vec<u8>>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        if let Ok(mut state) = self.state.lock() {
            state.secrets.insert(
                key.to_string(),
                StoredSecret {
                    labels: labels
                        .into_iter()
                        .map(|(k, v)| (k.into(), v.into()))
                        .collect(),
                    versions: versions.into_iter().collect(),
                },
            );
        }
        self
    }

    /// Insert a secret carrying the ownership label and one version
    #[must_use]
    pub fn with_managed_secret(self, key: &str, payload: Vec<u8>) -> Self {
        self.with_secret(key, [(MANAGED_BY_LABEL, MANAGED_BY_VALUE)], [payload])
    }

    /// Insert a secret without labels and with one version
    #[must_use]
    pub fn with_unmanaged_secret(self, key: &str, payload: Vec<u8>) -> Self {
        self.with_secret(key, std::iter::empty::<(String, String)>(), [payload])
    }

    /// Make every call of `operation` fail with HTTP `status`
    #[must_use]
    pub fn failing(self, operation: MemoryOperation, status: u16) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failures.insert(operation, status);
        }
        self
    }

    /// Versions of `key`, oldest first
    pub fn versions(&self, key: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.secrets.get(key).map(|s| s.versions.clone()))
            .unwrap_or_default()
    }

    pub fn labels(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.secrets.get(key).map(|s| s.labels.clone()))
    }

    pub fn calls(&self) -> MemoryCalls {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Filters received by listing calls, in order
    pub fn filters(&self) -> Vec<Option<String>> {
        self.state
            .lock()
            .map(|state| state.filters.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn listed_account(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.account)
    }

    fn owns_account(&self, account: &str) -> bool {
        account == self.account || self.alias.as_deref() == Some(account)
    }

    /// Logical key of `accounts/{account}/secrets/{key}`
    fn key_of<'n>(&self, name: &'n str) -> Result<&'n str> {
        let rest = name
            .strip_prefix("accounts/")
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        let (account, rest) = rest
            .split_once('/')
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        if !self.owns_account(account) {
            return Err(ProviderError::NotFound(name.to_string()));
        }
        rest.strip_prefix("secrets/")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    fn account_of<'n>(&self, parent: &'n str) -> Result<&'n str> {
        parent
            .strip_prefix("accounts/")
            .filter(|account| self.owns_account(account))
            .ok_or_else(|| ProviderError::NotFound(parent.to_string()))
    }

    /// Count the call, then apply latency and injected failures
    async fn enter(&self, operation: MemoryOperation) -> Result<()> {
        let failure = {
            let mut state = self.lock()?;
            match operation {
                MemoryOperation::Access => state.calls.access += 1,
                MemoryOperation::Get => state.calls.get += 1,
                MemoryOperation::Create => state.calls.create += 1,
                MemoryOperation::AddVersion => state.calls.add_version += 1,
                MemoryOperation::List => state.calls.list_pages += 1,
            }
            state.failures.get(&operation).copied()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.is_closed() {
            return Err(ProviderError::transport("client is closed"));
        }
        match failure {
            Some(status) => Err(ProviderError::Transport {
                status: Some(status),
                message: format!("injected {operation:?} failure"),
            }),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| ProviderError::transport(format!("in-memory store poisoned: {e}")))
    }
}

#[async_trait]
impl SecretManagerClient for InMemorySecretManager {
    async fn access_secret_version(&self, name: &str) -> Result<SecretVersion> {
        self.enter(MemoryOperation::Access).await?;
        let (secret, version) = name
            .rsplit_once("/versions/")
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        let key = self.key_of(secret)?;
        let state = self.lock()?;
        let stored = state
            .secrets
            .get(key)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        let index = if version == LATEST_VERSION {
            stored.versions.len().checked_sub(1)
        } else {
            version
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .filter(|i| *i < stored.versions.len())
        }
        .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        Ok(SecretVersion {
            name: format!("{secret}/versions/{}", index + 1),
            payload: stored.versions.get(index).cloned(),
        })
    }

    async fn get_secret(&self, name: &str) -> Result<RemoteSecret> {
        self.enter(MemoryOperation::Get).await?;
        let key = self.key_of(name)?;
        let state = self.lock()?;
        let stored = state
            .secrets
            .get(key)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        Ok(RemoteSecret {
            name: paths::secret_name(&self.account, key),
            labels: stored.labels.clone(),
        })
    }

    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<RemoteSecret> {
        self.enter(MemoryOperation::Create).await?;
        self.account_of(parent)?;
        let mut state = self.lock()?;
        if state.secrets.contains_key(secret_id) {
            return Err(ProviderError::Transport {
                status: Some(409),
                message: format!("secret {secret_id} already exists"),
            });
        }
        state.secrets.insert(
            secret_id.to_string(),
            StoredSecret {
                labels: labels.clone(),
                versions: Vec::new(),
            },
        );
        Ok(RemoteSecret {
            name: paths::secret_name(&self.account, secret_id),
            labels: labels.clone(),
        })
    }

    async fn add_secret_version(&self, parent: &str, payload: &[u8]) -> Result<SecretVersion> {
        self.enter(MemoryOperation::AddVersion).await?;
        let key = self.key_of(parent)?;
        let mut state = self.lock()?;
        let stored = state
            .secrets
            .get_mut(key)
            .ok_or_else(|| ProviderError::NotFound(parent.to_string()))?;
        stored.versions.push(payload.to_vec());
        Ok(SecretVersion {
            name: format!("{parent}/versions/{}", stored.versions.len()),
            payload: None,
        })
    }

    async fn list_secrets_page(
        &self,
        request: &ListSecretsRequest,
        page_token: Option<&str>,
    ) -> Result<ListSecretsPage> {
        self.enter(MemoryOperation::List).await?;
        self.account_of(&request.parent)?;
        let filter = request
            .filter
            .as_deref()
            .map(ListFilter::parse)
            .unwrap_or_default();
        let mut state = self.lock()?;
        state.filters.push(request.filter.clone());

        let account = self.listed_account();
        let matching: Vec<RemoteSecret> = state
            .secrets
            .iter()
            .map(|(key, stored)| RemoteSecret {
                name: paths::secret_name(account, key),
                labels: stored.labels.clone(),
            })
            .filter(|secret| {
                let name = if self.ignore_name_filter {
                    None
                } else {
                    Some(secret.name.as_str())
                };
                let labels = |k: &str| secret.labels.get(k).map(String::as_str);
                match name {
                    Some(name) => filter.matches(name, labels),
                    None => filter.matches_labels(labels),
                }
            })
            .collect();

        let start = page_token
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let requested = usize::try_from(request.page_size.max(1)).unwrap_or(usize::MAX);
        let page_size = self.page_size.min(requested);
        let end = start.saturating_add(page_size).min(matching.len());
        let next_page_token = (end < matching.len()).then(|| end.to_string());
        Ok(ListSecretsPage {
            secrets: matching.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            next_page_token,
            total_size: u32::try_from(matching.len()).ok(),
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
