//! # Secret Accessor
//!
//! Point lookups: a single secret version, optionally narrowed to a property
//! of its JSON payload, and whole payloads exploded into a secret map.
//!
//! Property paths containing `.` are first tried as one flat key, then as
//! nested field access. Values are returned as the string content for JSON
//! strings, as empty bytes for `null` and as the raw JSON text otherwise.

use super::client::SecretManagerClient;
use crate::crd::{RemoteSecretRef, SecretMap};
use crate::errors::{ProviderError, Result};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use tracing::debug;

/// Point lookups against one account
#[derive(Debug, Clone, Copy)]
pub struct SecretAccessor<'a> {
    client: &'a dyn SecretManagerClient,
    account_id: &'a str,
}

impl<'a> SecretAccessor<'a> {
    /// `NotInitialized` unless both a client and an account id are present
    pub fn new(client: Option<&'a dyn SecretManagerClient>, account_id: &'a str) -> Result<Self> {
        match client {
            Some(client) if !account_id.is_empty() => Ok(Self { client, account_id }),
            _ => Err(ProviderError::NotInitialized),
        }
    }

    pub fn client(&self) -> &'a dyn SecretManagerClient {
        self.client
    }

    pub fn account_id(&self) -> &'a str {
        self.account_id
    }

    /// Payload of the referenced version, or the requested property of it
    pub async fn get_secret(&self, reference: &RemoteSecretRef) -> Result<Vec<u8>> {
        let name = paths::version_name(self.account_id, &reference.key, reference.version_or_latest());
        let version = self.client.access_secret_version(&name).await?;
        let payload = version
            .payload
            .ok_or_else(|| ProviderError::MalformedSecret(reference.key.clone()))?;

        match reference.property.as_deref() {
            None | Some("") => Ok(payload),
            Some(property) => extract_property(&reference.key, &payload, property),
        }
    }

    /// Payload parsed as a flat JSON object
    ///
    /// String values are unwrapped to their content; any other value keeps
    /// its raw JSON bytes.
    pub async fn get_secret_map(&self, reference: &RemoteSecretRef) -> Result<SecretMap> {
        let payload = self.get_secret(reference).await?;
        explode_payload(&reference.key, &payload)
    }
}

/// Split a JSON object payload into a secret map
pub(crate) fn explode_payload(key: &str, payload: &[u8]) -> Result<SecretMap> {
    let fields: BTreeMap<String, Box<RawValue>> =
        serde_json::from_slice(payload).map_err(|source| ProviderError::Unmarshal {
            key: key.to_string(),
            source,
        })?;
    Ok(fields
        .into_iter()
        .map(|(field, raw)| (field, raw_bytes(&raw)))
        .collect())
}

/// Resolve `property` inside a JSON payload
pub(crate) fn extract_property(key: &str, payload: &[u8], property: &str) -> Result<Vec<u8>> {
    let not_found = || ProviderError::PropertyNotFound {
        key: key.to_string(),
        property: property.to_string(),
    };
    let document: Box<RawValue> = serde_json::from_slice(payload).map_err(|_parse| not_found())?;

    // A leading dot never names a flat key
    let dot = property.find('.');
    if dot != Some(0) {
        if let Some(value) = child(&document, property) {
            return Ok(raw_bytes(&value));
        }
    }
    if dot.is_some() {
        debug!(key = %key, property = %property, "Flat property lookup missed, trying nested path");
        let nested = property
            .split('.')
            .try_fold(document, |node, segment| child(&node, segment));
        if let Some(value) = nested {
            return Ok(raw_bytes(&value));
        }
    }
    Err(not_found())
}

/// Member of an object by name, or element of an array by index
fn child(node: &RawValue, segment: &str) -> Option<Box<RawValue>> {
    if let Ok(mut object) = serde_json::from_str::<BTreeMap<String, Box<RawValue>>>(node.get()) {
        return object.remove(segment);
    }
    let index: usize = segment.parse().ok()?;
    serde_json::from_str::<Vec<Box<RawValue>>>(node.get())
        .ok()?
        .into_iter()
        .nth(index)
}

/// String content for JSON strings, empty for `null`, raw JSON text otherwise
fn raw_bytes(value: &RawValue) -> Vec<u8> {
    if value.get().trim() == "null" {
        return Vec::new();
    }
    match serde_json::from_str::<String>(value.get()) {
        Ok(text) => text.into_bytes(),
        Err(_) => value.get().as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::client::InMemorySecretManager;

    #[test]
    fn test_flat_key_wins_over_nested_path() {
        let payload = br#"{"a.b":"v1","a":{"b":"v2"}}"#;
        assert_eq!(extract_property("k", payload, "a.b").expect("flat"), b"v1");
    }

    #[test]
    fn test_nested_path_used_when_flat_key_missing() {
        let payload = br#"{"a":{"b":"v2","list":[{"x":1},{"x":2}]}}"#;
        assert_eq!(extract_property("k", payload, "a.b").expect("nested"), b"v2");
        assert_eq!(extract_property("k", payload, "a.list.1.x").expect("index"), b"2");
    }

    #[test]
    fn test_non_string_values_keep_raw_json() {
        let payload = br#"{"obj": {"n": 1, "s": "x"}, "num": 42, "flag": true}"#;
        assert_eq!(
            extract_property("k", payload, "obj").expect("object"),
            br#"{"n": 1, "s": "x"}"#
        );
        assert_eq!(extract_property("k", payload, "num").expect("number"), b"42");
        assert_eq!(extract_property("k", payload, "flag").expect("bool"), b"true");
    }

    #[test]
    fn test_missing_property_and_non_json_payload() {
        let err = extract_property("k", br#"{"a":1}"#, "b").expect_err("absent");
        assert!(matches!(err, ProviderError::PropertyNotFound { .. }));
        let err = extract_property("k", b"plain text", "a").expect_err("not json");
        assert!(matches!(err, ProviderError::PropertyNotFound { .. }));
        // Leading dot is never a nested path
        let err = extract_property("k", br#"{"a":{"b":1}}"#, ".a").expect_err("absent");
        assert!(matches!(err, ProviderError::PropertyNotFound { .. }));
    }

    #[test]
    fn test_leading_dot_skips_flat_key() {
        let payload = br#"{".a":"lead","b":{"c":"nested"}}"#;
        let err = extract_property("k", payload, ".a").expect_err("flat key ignored");
        assert!(matches!(err, ProviderError::PropertyNotFound { .. }));
        assert_eq!(extract_property("k", payload, "b.c").expect("nested"), b"nested");
    }

    #[test]
    fn test_null_values_are_empty() {
        let payload = br#"{"token":null,"nested":{"gone":null},"price":1.50}"#;
        assert!(extract_property("k", payload, "token").expect("null").is_empty());
        assert!(extract_property("k", payload, "nested.gone").expect("null").is_empty());
        assert_eq!(extract_property("k", payload, "price").expect("number"), b"1.50");

        let map = explode_payload("k", payload).expect("object");
        assert!(map["token"].is_empty());
        assert_eq!(map["nested"], br#"{"gone":null}"#);
    }

    #[test]
    fn test_explode_mixes_strings_and_structures() {
        let map = explode_payload("k", br#"{"user":"a","cfg":{"port":5432},"esc":"line\nbreak"}"#)
            .expect("object");
        assert_eq!(map["user"], b"a");
        assert_eq!(map["cfg"], br#"{"port":5432}"#);
        assert_eq!(map["esc"], b"line\nbreak");

        let err = explode_payload("k", b"[1,2]").expect_err("not an object");
        assert!(matches!(err, ProviderError::Unmarshal { .. }));
    }

    #[tokio::test]
    async fn test_get_secret_builds_version_path() {
        let memory = InMemorySecretManager::new("p1").with_secret(
            "db/creds",
            std::iter::empty::<(String, String)>(),
            [b"old".to_vec(), b"new".to_vec()],
        );
        let client: &dyn SecretManagerClient = &memory;
        let accessor = SecretAccessor::new(Some(client), "p1").expect("initialized");
        let latest = accessor
            .get_secret(&RemoteSecretRef::new("db/creds"))
            .await
            .expect("latest");
        assert_eq!(latest, b"new");
        let first = accessor
            .get_secret(&RemoteSecretRef::new("db/creds").with_version("1"))
            .await
            .expect("v1");
        assert_eq!(first, b"old");
    }

    #[test]
    fn test_uninitialized_accessor() {
        let memory = InMemorySecretManager::new("p1");
        let client: &dyn SecretManagerClient = &memory;
        assert!(matches!(
            SecretAccessor::new(None, "p1"),
            Err(ProviderError::NotInitialized)
        ));
        assert!(matches!(
            SecretAccessor::new(Some(client), ""),
            Err(ProviderError::NotInitialized)
        ));
    }
}
