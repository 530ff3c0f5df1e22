//! # Secret Manager resource names
//!
//! Builders and parsers for `accounts/{account}/secrets/{key}/versions/{version}`.

/// Collection segment for accounts
pub const ACCOUNTS_COLLECTION: &str = "accounts";
/// Collection segment for secrets under an account
pub const SECRETS_COLLECTION: &str = "secrets";
/// Collection segment for versions under a secret
pub const VERSIONS_COLLECTION: &str = "versions";
/// Version alias resolving to the most recently added version
pub const LATEST_VERSION: &str = "latest";

/// `accounts/{account}`
pub fn account_name(account: &str) -> String {
    format!("{ACCOUNTS_COLLECTION}/{account}")
}

/// `accounts/{account}/secrets/{key}`
pub fn secret_name(account: &str, key: &str) -> String {
    format!("{ACCOUNTS_COLLECTION}/{account}/{SECRETS_COLLECTION}/{key}")
}

/// `accounts/{account}/secrets/{key}/versions/{version}`
///
/// An empty version resolves to [`LATEST_VERSION`].
pub fn version_name(account: &str, key: &str, version: &str) -> String {
    let version = if version.is_empty() {
        LATEST_VERSION
    } else {
        version
    };
    format!(
        "{}/{VERSIONS_COLLECTION}/{version}",
        secret_name(account, key)
    )
}

/// Account segment of a full resource name.
///
/// The listing API may return a numeric account alias instead of the
/// human-readable id used in the request, so the segment is treated as opaque.
pub fn account_segment(resource_name: &str) -> Option<&str> {
    resource_name.split('/').nth(1).filter(|s| !s.is_empty())
}

/// Logical key of a secret resource name, i.e. the name with its
/// `accounts/{alias}/secrets/` prefix stripped.
///
/// Names that do not carry the prefix are returned unchanged.
pub fn logical_key(resource_name: &str) -> &str {
    let Some(account) = account_segment(resource_name) else {
        return resource_name;
    };
    let prefix = format!("{ACCOUNTS_COLLECTION}/{account}/{SECRETS_COLLECTION}/");
    resource_name
        .strip_prefix(prefix.as_str())
        .unwrap_or(resource_name)
}

/// `(account, key)` of a secret resource name.
///
/// Everything after `accounts/{account}/secrets/` is the key, slashes included.
pub fn parse_secret_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix(ACCOUNTS_COLLECTION)?.strip_prefix('/')?;
    let (account, rest) = rest.split_once('/')?;
    let key = rest.strip_prefix(SECRETS_COLLECTION)?.strip_prefix('/')?;
    (!account.is_empty() && !key.is_empty()).then_some((account, key))
}

/// `(account, key, version)` of a version resource name.
///
/// The version is the segment after the last `/versions/`.
pub fn parse_version_name(name: &str) -> Option<(&str, &str, &str)> {
    let marker = format!("/{VERSIONS_COLLECTION}/");
    let (secret, version) = name.rsplit_once(marker.as_str())?;
    if version.is_empty() || version.contains('/') {
        return None;
    }
    let (account, key) = parse_secret_name(secret)?;
    Some((account, key, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_name_defaults_to_latest() {
        assert_eq!(
            version_name("p1", "db/creds", ""),
            "accounts/p1/secrets/db/creds/versions/latest"
        );
        assert_eq!(
            version_name("p1", "api-key", "3"),
            "accounts/p1/secrets/api-key/versions/3"
        );
    }

    #[test]
    fn test_logical_key_uses_returned_alias() {
        // Listing returns the numeric alias, not "my-project"
        assert_eq!(
            logical_key("accounts/123456789/secrets/db/creds"),
            "db/creds"
        );
        assert_eq!(logical_key("accounts/p1/secrets/token"), "token");
    }

    #[test]
    fn test_parse_keeps_slashes_inside_key() {
        assert_eq!(
            parse_secret_name("accounts/p1/secrets/db/creds"),
            Some(("p1", "db/creds"))
        );
        assert_eq!(
            parse_version_name("accounts/p1/secrets/db/creds/versions/latest"),
            Some(("p1", "db/creds", "latest"))
        );
        assert_eq!(
            parse_version_name(&version_name("p1", "a/versions/b", "2")),
            Some(("p1", "a/versions/b", "2"))
        );
        assert_eq!(parse_secret_name("accounts/p1/secrets/"), None);
        assert_eq!(parse_secret_name("accounts/p1"), None);
        assert_eq!(parse_version_name("accounts/p1/secrets/k"), None);
    }

    #[test]
    fn test_logical_key_without_prefix() {
        assert_eq!(logical_key("plain-name"), "plain-name");
        assert_eq!(account_segment("plain-name"), None);
    }
}
