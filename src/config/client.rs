//! # Client Configuration
//!
//! Transport endpoints, timeouts and credential-chain inputs loaded from
//! environment variables.

use crate::constants::{
    DEFAULT_AUTHORITY_HOST, DEFAULT_LIST_PAGE_SIZE, DEFAULT_METADATA_HOST,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SECRET_MANAGER_ENDPOINT, DEFAULT_TOKEN_EXPIRY_SKEW_SECS,
    ENV_APPLICATION_CREDENTIALS, ENV_CLIENT_ID, ENV_FEDERATED_TOKEN_FILE, ENV_TENANT_ID,
};

/// Provider client configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Secret Manager REST endpoint, including the API version segment
    pub endpoint: String,
    /// Timeout for a single remote request (seconds)
    pub request_timeout_secs: u64,
    /// Page size requested when listing secrets
    pub list_page_size: u32,
    /// Metadata server host used by ambient credentials
    pub metadata_host: String,
    /// Optional service account key file used by ambient credentials
    pub application_credentials: Option<String>,
    /// Cached tokens are refreshed this many seconds before expiry
    pub token_expiry_skew_secs: i64,
    /// Authority host for the workload identity token exchange
    pub authority_host: String,
    /// Workload identity inputs used when no service account reference is given
    pub workload_identity: WorkloadIdentityEnv,
}

/// Environment inputs injected by the workload identity webhook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadIdentityEnv {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub federated_token_file: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
            application_credentials: None,
            token_expiry_skew_secs: DEFAULT_TOKEN_EXPIRY_SKEW_SECS,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            workload_identity: WorkloadIdentityEnv::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            endpoint: env_var_or_default(
                "SECRET_MANAGER_ENDPOINT",
                DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            ),
            request_timeout_secs: env_var_or_default(
                "SECRET_MANAGER_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            list_page_size: env_var_or_default("SECRET_MANAGER_LIST_PAGE_SIZE", DEFAULT_LIST_PAGE_SIZE),
            metadata_host: env_var_or_default("GCE_METADATA_HOST", DEFAULT_METADATA_HOST.to_string()),
            application_credentials: non_empty_env(ENV_APPLICATION_CREDENTIALS),
            token_expiry_skew_secs: env_var_or_default(
                "TOKEN_EXPIRY_SKEW_SECS",
                DEFAULT_TOKEN_EXPIRY_SKEW_SECS,
            ),
            authority_host: env_var_or_default(
                "AZURE_AUTHORITY_HOST",
                DEFAULT_AUTHORITY_HOST.to_string(),
            ),
            workload_identity: WorkloadIdentityEnv::from_env(),
        }
    }
}

impl WorkloadIdentityEnv {
    pub fn from_env() -> Self {
        Self {
            client_id: non_empty_env(ENV_CLIENT_ID),
            tenant_id: non_empty_env(ENV_TENANT_ID),
            federated_token_file: non_empty_env(ENV_FEDERATED_TOKEN_FILE),
        }
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
