//! # Response Types
//!
//! Secret Manager REST API response structures, plus the replication and
//! payload shapes shared with requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replication policy of a secret
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Replication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic: Option<AutomaticReplication>,
}

/// Automatic replication carries no settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomaticReplication {}

/// Base64-encoded payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Secret resource
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretResponse {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Response of `GET {version}:access`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessSecretVersionResponse {
    pub name: String,
    #[serde(default)]
    pub payload: Option<SecretPayload>,
}

/// Secret version resource (returned by `:addVersion`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretVersionResponse {
    pub name: String,
}

/// Response of `GET accounts/{account}/secrets`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSecretsResponse {
    #[serde(default)]
    pub secrets: Vec<SecretResponse>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub total_size: Option<u32>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
