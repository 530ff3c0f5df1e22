//! # Secret Finder
//!
//! Bulk discovery by name pattern or by label equality over the paginated
//! listing API.
//!
//! The listing filter can only express substring containment on names, so a
//! path prefix is always re-checked client-side against the logical key.

use super::accessor::SecretAccessor;
use super::client::{list_secrets, ListSecretsRequest};
use crate::crd::{FindQuery, RemoteSecretRef, SecretMap};
use crate::errors::{ProviderError, Result};
use paths::ListFilter;
use regex::Regex;
use tracing::debug;

/// Rewrites the keys of a discovered secret map before it is returned
pub trait KeyConverter: Send + Sync {
    fn convert(&self, secrets: SecretMap) -> SecretMap;
}

/// Keeps keys exactly as discovered
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKeys;

impl KeyConverter for IdentityKeys {
    fn convert(&self, secrets: SecretMap) -> SecretMap {
        secrets
    }
}

impl<F> KeyConverter for F
where
    F: Fn(SecretMap) -> SecretMap + Send + Sync,
{
    fn convert(&self, secrets: SecretMap) -> SecretMap {
        self(secrets)
    }
}

/// Search mode selected by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    ByName,
    ByTags,
}

impl FindMode {
    /// `UnsupportedQuery` when the query names neither a pattern nor tags
    pub fn of(query: &FindQuery) -> Result<Self> {
        if query.name.is_some() {
            Ok(Self::ByName)
        } else if !query.tags.is_empty() {
            Ok(Self::ByTags)
        } else {
            Err(ProviderError::UnsupportedQuery)
        }
    }
}

/// Bulk discovery against one account
#[derive(Debug, Clone, Copy)]
pub struct SecretFinder<'a> {
    accessor: SecretAccessor<'a>,
    page_size: u32,
}

impl<'a> SecretFinder<'a> {
    pub fn new(accessor: SecretAccessor<'a>, page_size: u32) -> Self {
        Self {
            accessor,
            page_size,
        }
    }

    /// Every secret matching `query`, keyed through `converter`
    pub async fn get_all_secrets(
        &self,
        query: &FindQuery,
        converter: &dyn KeyConverter,
    ) -> Result<SecretMap> {
        let found = match FindMode::of(query)? {
            FindMode::ByName => self.find_by_name(query).await?,
            FindMode::ByTags => self.find_by_tags(query).await?,
        };
        Ok(converter.convert(found))
    }

    async fn find_by_name(&self, query: &FindQuery) -> Result<SecretMap> {
        let pattern = query
            .name
            .as_ref()
            .map(|name| name.regexp.as_str())
            .ok_or(ProviderError::UnsupportedQuery)?;
        let matcher = Regex::new(pattern).map_err(|e| {
            ProviderError::Config(format!("could not compile find.name.regexp {pattern:?}: {e}"))
        })?;
        let mut filter = ListFilter::new();
        if let Some(path) = query.path.as_deref() {
            filter = filter.name_contains(path);
        }
        self.collect(query, filter, |key| matcher.is_match(key)).await
    }

    async fn find_by_tags(&self, query: &FindQuery) -> Result<SecretMap> {
        let mut filter = query
            .tags
            .iter()
            .fold(ListFilter::new(), |filter, (k, v)| filter.label(k, v));
        if let Some(path) = query.path.as_deref() {
            filter = filter.name_contains(path);
        }
        debug!(filter = %filter, "Finding secrets by tags");
        // Tag clauses are authoritative once the server applied them
        self.collect(query, filter, |_| true).await
    }

    /// Page through the listing and fetch every accepted entry
    async fn collect<M>(&self, query: &FindQuery, filter: ListFilter, accept: M) -> Result<SecretMap>
    where
        M: Fn(&str) -> bool,
    {
        let request = ListSecretsRequest {
            parent: paths::account_name(self.accessor.account_id()),
            filter: filter.to_query(),
            page_size: self.page_size,
        };
        let mut secrets = list_secrets(self.accessor.client(), request);
        let mut found = SecretMap::new();
        while let Some(secret) = secrets.next().await? {
            let key = paths::logical_key(&secret.name);
            if !accept(key) || !query.matches_path(key) {
                continue;
            }
            debug!(key = %key, remaining = secrets.remaining(), "Found matching secret");
            let payload = self.accessor.get_secret(&RemoteSecretRef::new(key)).await?;
            found.insert(key.to_string(), payload);
        }
        Ok(found)
    }
}
