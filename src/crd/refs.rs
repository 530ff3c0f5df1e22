//! # Remote References
//!
//! Point lookups, find queries and push targets addressed at the remote store.

use paths::LATEST_VERSION;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Secret data keyed by name, values are raw bytes
pub type SecretMap = BTreeMap<String, Vec<u8>>;

fn default_version() -> String {
    LATEST_VERSION.to_string()
}

/// Reference to a single remote secret version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSecretRef {
    /// Logical secret key
    pub key: String,
    /// Version id, `latest` when unspecified
    #[serde(default = "default_version")]
    pub version: String,
    /// Property path into a structured payload
    #[serde(default)]
    pub property: Option<String>,
}

impl RemoteSecretRef {
    /// Reference to the latest version of `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: default_version(),
            property: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Version to address; empty strings fall back to `latest`
    pub fn version_or_latest(&self) -> &str {
        if self.version.is_empty() {
            LATEST_VERSION
        } else {
            &self.version
        }
    }
}

/// Name pattern for find-by-name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindName {
    /// Regular expression matched anywhere in the logical key
    pub regexp: String,
}

/// Bulk discovery query
///
/// Exactly one of `name` or `tags` drives the search. `name` wins when both
/// are present; supplying neither is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindQuery {
    #[serde(default)]
    pub name: Option<FindName>,
    /// Required label equalities
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Logical key prefix
    #[serde(default)]
    pub path: Option<String>,
}

impl FindQuery {
    pub fn by_name(regexp: impl Into<String>) -> Self {
        Self {
            name: Some(FindName {
                regexp: regexp.into(),
            }),
            ..Default::default()
        }
    }

    pub fn by_tags<K, V>(tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether `key` satisfies the path prefix (always true without a path)
    pub fn matches_path(&self, key: &str) -> bool {
        self.path
            .as_deref()
            .is_none_or(|prefix| key.starts_with(prefix))
    }
}

/// Target of a push
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PushRef {
    pub remote_key: String,
}

impl PushRef {
    pub fn new(remote_key: impl Into<String>) -> Self {
        Self {
            remote_key: remote_key.into(),
        }
    }
}
