//! # Store Validation
//!
//! Structural checks on a store before any client is built. No network I/O.

use crate::crd::{SecretKeySelector, SecretStore, ServiceAccountSelector, StoreKind};
use crate::errors::{ProviderError, Result};

/// Reject stores whose shape cannot produce a working provider
pub fn validate_store(store: &SecretStore) -> Result<()> {
    let spec = store
        .spec
        .as_ref()
        .ok_or_else(|| ProviderError::Config("store is missing spec".to_string()))?;
    let provider = spec
        .provider
        .as_ref()
        .ok_or_else(|| ProviderError::Config("store is missing provider".to_string()))?;
    let secret_manager = provider.secret_manager.as_ref().ok_or_else(|| {
        ProviderError::Config("store is missing secret manager provider".to_string())
    })?;

    if let Some(secret_ref) = &secret_manager.auth.secret_ref {
        validate_secret_selector(store, &secret_ref.secret_access_key).map_err(|reason| {
            ProviderError::Config(format!("invalid Auth.SecretRef.SecretAccessKey: {reason}"))
        })?;
    }
    if let Some(selector) = secret_manager
        .auth
        .workload_identity
        .as_ref()
        .and_then(|wi| wi.service_account_ref.as_ref())
    {
        validate_service_account_selector(store, selector).map_err(|reason| {
            ProviderError::Config(format!(
                "invalid Auth.WorkloadIdentity.ServiceAccountRef: {reason}"
            ))
        })?;
    }
    Ok(())
}

fn validate_secret_selector(store: &SecretStore, selector: &SecretKeySelector) -> Result<(), String> {
    if selector.name.is_empty() {
        return Err("name is required".to_string());
    }
    if selector.key.is_empty() {
        return Err("key is required".to_string());
    }
    validate_namespace(store, selector.namespace.as_deref())
}

fn validate_service_account_selector(
    store: &SecretStore,
    selector: &ServiceAccountSelector,
) -> Result<(), String> {
    if selector.name.is_empty() {
        return Err("name is required".to_string());
    }
    validate_namespace(store, selector.namespace.as_deref())
}

/// Cluster stores must name a namespace; namespaced stores may only name their own
fn validate_namespace(store: &SecretStore, namespace: Option<&str>) -> Result<(), String> {
    match store.kind {
        StoreKind::ClusterSecretStore => match namespace {
            Some(ns) if !ns.is_empty() => Ok(()),
            _ => Err("cluster scope requires namespace".to_string()),
        },
        StoreKind::SecretStore => match (namespace, store.namespace.as_deref()) {
            (Some(ns), Some(own)) if ns != own => {
                Err(format!("namespace {ns:?} not allowed, store lives in {own:?}"))
            }
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ProviderSpec, SecretManagerAuth, SecretManagerSpec, SecretRefAuth, StoreSpec,
        WorkloadIdentityAuth,
    };

    fn store(kind: StoreKind, auth: SecretManagerAuth) -> SecretStore {
        SecretStore {
            kind,
            name: "gsm".to_string(),
            namespace: (kind == StoreKind::SecretStore).then(|| "team-a".to_string()),
            spec: Some(StoreSpec {
                provider: Some(ProviderSpec {
                    secret_manager: Some(SecretManagerSpec {
                        account_id: "p1".to_string(),
                        auth,
                    }),
                }),
            }),
        }
    }

    fn secret_ref(namespace: Option<&str>) -> SecretManagerAuth {
        SecretManagerAuth {
            secret_ref: Some(SecretRefAuth {
                secret_access_key: SecretKeySelector {
                    name: "sa".to_string(),
                    namespace: namespace.map(str::to_string),
                    key: "creds.json".to_string(),
                },
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_layers_are_config_errors() {
        let empty = SecretStore::default();
        assert!(matches!(validate_store(&empty), Err(ProviderError::Config(_))));

        let no_provider = SecretStore {
            spec: Some(StoreSpec::default()),
            ..Default::default()
        };
        assert!(matches!(validate_store(&no_provider), Err(ProviderError::Config(_))));

        let no_secret_manager = SecretStore {
            spec: Some(StoreSpec {
                provider: Some(ProviderSpec::default()),
            }),
            ..Default::default()
        };
        assert!(matches!(
            validate_store(&no_secret_manager),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn test_ambient_store_is_valid() {
        validate_store(&store(StoreKind::SecretStore, SecretManagerAuth::default()))
            .expect("no auth is ambient");
    }

    #[test]
    fn test_cluster_store_selector_needs_namespace() {
        let err = validate_store(&store(StoreKind::ClusterSecretStore, secret_ref(None)))
            .expect_err("namespace required");
        assert!(err.to_string().contains("cluster scope requires namespace"));
        validate_store(&store(StoreKind::ClusterSecretStore, secret_ref(Some("ops"))))
            .expect("explicit namespace");
    }

    #[test]
    fn test_namespaced_store_cannot_reach_other_namespace() {
        let err = validate_store(&store(StoreKind::SecretStore, secret_ref(Some("ops"))))
            .expect_err("cross namespace");
        assert!(matches!(err, ProviderError::Config(_)));
        validate_store(&store(StoreKind::SecretStore, secret_ref(Some("team-a"))))
            .expect("own namespace");
        validate_store(&store(StoreKind::SecretStore, secret_ref(None))).expect("implicit");
    }

    #[test]
    fn test_workload_identity_selector_needs_name() {
        let auth = SecretManagerAuth {
            workload_identity: Some(WorkloadIdentityAuth {
                service_account_ref: Some(ServiceAccountSelector::default()),
                scope: None,
            }),
            ..Default::default()
        };
        let err = validate_store(&store(StoreKind::SecretStore, auth)).expect_err("no name");
        assert!(err.to_string().contains("ServiceAccountRef"));
    }
}
