//! # Constants
//!
//! Defaults and fixed identifiers used across the provider.

/// Label marking a remote secret as owned by this system
pub const MANAGED_BY_LABEL: &str = "managed-by";
/// Value of [`MANAGED_BY_LABEL`] on owned secrets
pub const MANAGED_BY_VALUE: &str = "external-secrets";

/// Platform-wide access role requested by service-account and ambient credentials
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Default Secret Manager REST endpoint
pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
/// Default timeout for a single remote request (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default page size for secret listing
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 100;
/// Default metadata server host for ambient credentials
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
/// Tokens are refreshed this many seconds before they expire
pub const DEFAULT_TOKEN_EXPIRY_SKEW_SECS: i64 = 60;
/// Lifetime requested for self-signed service account assertions (seconds)
pub const SERVICE_ACCOUNT_ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Default authority host for the workload identity token exchange
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
/// Service account annotation carrying the federated client id
pub const ANNOTATION_CLIENT_ID: &str = "azure.workload.identity/client-id";
/// Service account annotation carrying the tenant id
pub const ANNOTATION_TENANT_ID: &str = "azure.workload.identity/tenant-id";
/// Audience always requested for projected service account tokens
pub const DEFAULT_TOKEN_AUDIENCE: &str = "api://AzureADTokenExchange";
/// Client assertion type for the federated token exchange
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
/// Grant type for the service account JWT-bearer exchange
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Environment variable: workload identity client id
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
/// Environment variable: workload identity tenant id
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Environment variable: path to the projected service account token
pub const ENV_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
/// Environment variable: ambient service account key file
pub const ENV_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
