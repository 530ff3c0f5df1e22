//! # Request Types
//!
//! Secret Manager REST API request structures.
//!
//! These structs represent the JSON payloads sent to the REST API v1.
//! Payload bytes always travel base64-encoded.

use serde::Serialize;
use std::collections::BTreeMap;

use super::responses::{AutomaticReplication, Replication, SecretPayload};

/// Request body for creating a new secret
///
/// Used in `POST /v1/accounts/{account}/secrets?secretId={key}`. This creates
/// the secret metadata only; values are added with [`AddVersionRequest`].
#[derive(Debug, Serialize)]
pub struct CreateSecretRequest {
    /// Replication configuration for the secret
    pub replication: Replication,
    /// Labels attached to the secret (ownership marker among them)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl CreateSecretRequest {
    /// Create a new request with automatic replication
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self {
            replication: Replication {
                automatic: Some(AutomaticReplication {}),
            },
            labels,
        }
    }
}

/// Request body for adding a new version to an existing secret
///
/// Used in `POST /v1/accounts/{account}/secrets/{key}:addVersion`.
#[derive(Debug, Serialize)]
pub struct AddVersionRequest {
    /// The secret payload containing the base64-encoded secret value
    pub payload: SecretPayload,
}

impl AddVersionRequest {
    /// Create a new request with already base64-encoded data
    pub fn new(data: String) -> Self {
        Self {
            payload: SecretPayload { data: Some(data) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_uses_automatic_replication() {
        let labels = BTreeMap::from([("managed-by".to_string(), "external-secrets".to_string())]);
        let json = serde_json::to_value(CreateSecretRequest::new(labels)).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "replication": {"automatic": {}},
                "labels": {"managed-by": "external-secrets"}
            })
        );
    }
}
