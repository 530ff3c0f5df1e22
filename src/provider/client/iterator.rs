//! # Secret Iterator
//!
//! Drives `list_secrets_page` until the remote stops returning a page token,
//! or returns the token it was just given.

use super::{ListSecretsPage, ListSecretsRequest, RemoteSecret, SecretManagerClient};
use crate::errors::Result;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Lazily paginated listing
#[derive(Debug)]
pub struct SecretIterator<'a> {
    client: &'a dyn SecretManagerClient,
    request: ListSecretsRequest,
    buffer: VecDeque<RemoteSecret>,
    next_page_token: Option<String>,
    exhausted: bool,
    pages: usize,
}

impl<'a> SecretIterator<'a> {
    pub fn new(client: &'a dyn SecretManagerClient, request: ListSecretsRequest) -> Self {
        Self {
            client,
            request,
            buffer: VecDeque::new(),
            next_page_token: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Next secret, fetching the next page when the buffer runs dry
    pub async fn next(&mut self) -> Result<Option<RemoteSecret>> {
        loop {
            if let Some(secret) = self.buffer.pop_front() {
                return Ok(Some(secret));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page = self
                .client
                .list_secrets_page(&self.request, self.next_page_token.as_deref())
                .await?;
            self.absorb(page);
        }
    }

    /// Entries already fetched but not yet returned
    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }

    /// Pages fetched so far
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn absorb(&mut self, page: ListSecretsPage) {
        self.pages += 1;
        let next = page.next_page_token.filter(|token| !token.is_empty());
        if next.is_some() && next == self.next_page_token {
            warn!(
                page = self.pages,
                parent = %self.request.parent,
                "Listing returned the same page token twice, stopping"
            );
            self.next_page_token = None;
        } else {
            self.next_page_token = next;
        }
        self.exhausted = self.next_page_token.is_none();
        self.buffer.extend(page.secrets);
        debug!(
            page = self.pages,
            remaining = self.remaining(),
            total_size = ?page.total_size,
            "Fetched secret listing page"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::client::InMemorySecretManager;

    #[tokio::test]
    async fn test_paginates_until_exhausted() {
        let memory = (0..5).fold(
            InMemorySecretManager::new("p1").with_page_size(2),
            |memory, i| memory.with_managed_secret(&format!("s{i}"), b"x".to_vec()),
        );
        let mut iter = SecretIterator::new(
            &memory,
            ListSecretsRequest {
                parent: "accounts/p1".to_string(),
                filter: None,
                page_size: 100,
            },
        );
        let mut names = Vec::new();
        while let Some(secret) = iter.next().await.expect("page") {
            names.push(secret.name);
        }
        assert_eq!(names.len(), 5);
        assert_eq!(iter.pages(), 3);
        assert_eq!(iter.remaining(), 0);
        assert_eq!(names[0], "accounts/p1/secrets/s0");
    }
}
