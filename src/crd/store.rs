//! # Store Configuration
//!
//! Store specification types consumed by the provider factory.
//!
//! The shapes mirror what a `SecretStore`/`ClusterSecretStore` custom resource
//! carries, so a host controller can embed them directly in its CRD schema.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scope of the store the provider is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum StoreKind {
    /// Namespace-scoped store; credentials always come from the caller's namespace
    #[default]
    SecretStore,
    /// Cluster-scoped store; may reference credentials in other namespaces,
    /// but must name the namespace explicitly
    ClusterSecretStore,
}

impl StoreKind {
    pub fn is_cluster_scoped(self) -> bool {
        matches!(self, StoreKind::ClusterSecretStore)
    }
}

/// A store resource as seen by the provider
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretStore {
    pub kind: StoreKind,
    /// Store name, used only for diagnostics
    #[serde(default)]
    pub name: String,
    /// Namespace of a namespaced store
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub spec: Option<StoreSpec>,
}

/// Store specification
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreSpec {
    #[serde(default)]
    pub provider: Option<ProviderSpec>,
}

/// Provider selection; only Secret Manager is handled here
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    #[serde(default)]
    pub secret_manager: Option<SecretManagerSpec>,
}

/// Secret Manager provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretManagerSpec {
    /// Remote account (project) identifier used to build resource names
    #[serde(alias = "projectId")]
    pub account_id: String,
    /// Authentication configuration. When empty, ambient credentials are used.
    #[serde(default)]
    pub auth: SecretManagerAuth,
}

/// Authentication configuration
///
/// Strategies are tried in order: `secretRef`, `workloadIdentity`, then ambient
/// default credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretManagerAuth {
    #[serde(default)]
    pub secret_ref: Option<SecretRefAuth>,
    #[serde(default)]
    pub workload_identity: Option<WorkloadIdentityAuth>,
}

/// Service account key stored in a Kubernetes secret
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRefAuth {
    /// Key selector pointing at the service account JSON
    pub secret_access_key: SecretKeySelector,
}

/// Workload identity configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityAuth {
    /// Service account whose annotations name the client and tenant.
    /// When absent, the environment injected by the workload identity webhook is used.
    #[serde(default)]
    pub service_account_ref: Option<ServiceAccountSelector>,
    /// Scope requested in the token exchange. Defaults to the cloud-platform role.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Reference to a key inside a Kubernetes secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub name: String,
    /// Only cluster-scoped stores may (and must) set this
    #[serde(default)]
    pub namespace: Option<String>,
    pub key: String,
}

/// Reference to a Kubernetes service account
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSelector {
    pub name: String,
    /// Only cluster-scoped stores may (and must) set this
    #[serde(default)]
    pub namespace: Option<String>,
    /// Extra audiences requested for the projected token
    #[serde(default)]
    pub audiences: Vec<String>,
}

impl SecretStore {
    /// Secret Manager configuration, if the store carries one
    pub fn secret_manager(&self) -> Option<&SecretManagerSpec> {
        self.spec.as_ref()?.provider.as_ref()?.secret_manager.as_ref()
    }
}
