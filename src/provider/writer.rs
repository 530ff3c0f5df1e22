//! # Secret Writer
//!
//! Idempotent, ownership-checked push of a payload to a remote secret.
//!
//! 1. Get the secret, creating it with the ownership label when absent
//! 2. Refuse secrets that do not carry the ownership label
//! 3. Skip the write when the latest version already holds the payload
//! 4. Otherwise append a new version

use super::client::SecretManagerClient;
use crate::constants::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::crd::PushRef;
use crate::errors::{ProviderError, Result};
use paths::LATEST_VERSION;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Labels attached to secrets created by this provider
pub fn ownership_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())])
}

/// Whether a label set marks the secret as owned by this provider
pub fn is_managed(labels: &BTreeMap<String, String>) -> bool {
    labels.get(MANAGED_BY_LABEL).map(String::as_str) == Some(MANAGED_BY_VALUE)
}

/// Push operations against one account
#[derive(Debug, Clone, Copy)]
pub struct SecretWriter<'a> {
    client: &'a dyn SecretManagerClient,
    account_id: &'a str,
}

impl<'a> SecretWriter<'a> {
    /// `NotInitialized` unless both a client and an account id are present
    pub fn new(client: Option<&'a dyn SecretManagerClient>, account_id: &'a str) -> Result<Self> {
        match client {
            Some(client) if !account_id.is_empty() => Ok(Self { client, account_id }),
            _ => Err(ProviderError::NotInitialized),
        }
    }

    /// Upsert `payload` into `push.remote_key`.
    ///
    /// Returns `true` when a new version was written and `false` when the
    /// latest version already held the same bytes.
    pub async fn set_secret(&self, payload: &[u8], push: &PushRef) -> Result<bool> {
        let key = push.remote_key.as_str();
        if key.is_empty() {
            return Err(ProviderError::Config("push remote key is empty".to_string()));
        }
        let secret_name = paths::secret_name(self.account_id, key);

        let secret = match self.client.get_secret(&secret_name).await {
            Ok(secret) => secret,
            Err(e) if e.is_not_found() => {
                info!(secret.name = %key, account.id = %self.account_id, "Creating remote secret");
                self.client
                    .create_secret(
                        &paths::account_name(self.account_id),
                        key,
                        &ownership_labels(),
                    )
                    .await?
            }
            Err(e) => return Err(e),
        };

        if !is_managed(&secret.labels) {
            warn!(secret.name = %key, "Refusing to write secret without ownership label");
            return Err(ProviderError::NotManaged(key.to_string()));
        }

        let latest = paths::version_name(self.account_id, key, LATEST_VERSION);
        match self.client.access_secret_version(&latest).await {
            Ok(version) if version.payload.as_deref() == Some(payload) => {
                debug!(secret.name = %key, "Latest version unchanged, skipping write");
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.client.add_secret_version(&secret_name, payload).await?;
        info!(secret.name = %key, "Added secret version");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::client::{InMemorySecretManager, MemoryOperation};

    async fn push(memory: &InMemorySecretManager, key: &str, payload: &[u8]) -> Result<bool> {
        let client: &dyn SecretManagerClient = memory;
        SecretWriter::new(Some(client), "p1")?
            .set_secret(payload, &PushRef::new(key))
            .await
    }

    #[tokio::test]
    async fn test_creates_owned_secret_on_first_push() {
        let memory = InMemorySecretManager::new("p1");
        assert!(push(&memory, "db/creds", b"v1").await.expect("push"));
        assert_eq!(memory.labels("db/creds"), Some(ownership_labels()));
        assert_eq!(memory.versions("db/creds"), vec![b"v1".to_vec()]);
    }

    #[tokio::test]
    async fn test_identical_payload_is_a_no_op() {
        let memory = InMemorySecretManager::new("p1");
        assert!(push(&memory, "k", b"same").await.expect("first"));
        assert!(!push(&memory, "k", b"same").await.expect("second"));
        assert_eq!(memory.versions("k").len(), 1);
        assert_eq!(memory.calls().add_version, 1);

        assert!(push(&memory, "k", b"changed").await.expect("third"));
        assert_eq!(memory.versions("k").len(), 2);
    }

    #[tokio::test]
    async fn test_unmanaged_secret_is_never_written() {
        let memory = InMemorySecretManager::new("p1").with_unmanaged_secret("k", b"theirs".to_vec());
        let err = push(&memory, "k", b"ours").await.expect_err("not managed");
        assert!(matches!(err, ProviderError::NotManaged(_)));
        assert_eq!(memory.versions("k"), vec![b"theirs".to_vec()]);
        assert_eq!(memory.calls().add_version, 0);
        assert_eq!(memory.calls().access, 0);
    }

    #[tokio::test]
    async fn test_wrong_label_value_is_not_managed() {
        let memory = InMemorySecretManager::new("p1").with_secret(
            "k",
            [(MANAGED_BY_LABEL, "someone-else")],
            [b"x".to_vec()],
        );
        let err = push(&memory, "k", b"y").await.expect_err("not managed");
        assert!(matches!(err, ProviderError::NotManaged(_)));
    }

    #[tokio::test]
    async fn test_get_failure_other_than_not_found_is_fatal() {
        let memory = InMemorySecretManager::new("p1").failing(MemoryOperation::Get, 500);
        let err = push(&memory, "k", b"v").await.expect_err("fatal");
        assert!(matches!(err, ProviderError::Transport { status: Some(500), .. }));
        assert_eq!(memory.calls().create, 0);
    }

    #[tokio::test]
    async fn test_version_read_failure_is_fatal() {
        let memory = InMemorySecretManager::new("p1")
            .with_managed_secret("k", b"v".to_vec())
            .failing(MemoryOperation::Access, 503);
        let err = push(&memory, "k", b"w").await.expect_err("fatal");
        assert!(err.is_transient());
        assert_eq!(memory.calls().add_version, 0);
    }

    #[tokio::test]
    async fn test_owned_secret_without_versions_gets_first_version() {
        let memory = InMemorySecretManager::new("p1").with_secret(
            "k",
            [(MANAGED_BY_LABEL, MANAGED_BY_VALUE)],
            Vec::new(),
        );
        assert!(push(&memory, "k", b"v").await.expect("push"));
        assert_eq!(memory.versions("k"), vec![b"v".to_vec()]);
    }
}
