//! # Access Tokens
//!
//! Bearer tokens, the `TokenSource` seam consumed by the transport, and a
//! caching wrapper that refreshes shortly before expiry.

use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

/// Bearer token with an optional validity window
///
/// Held in memory only for the lifetime of the provider instance; the
/// secret is wiped when the last copy is dropped.
#[derive(Clone)]
pub struct AccessToken {
    secret: Zeroizing<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            expires_at,
        }
    }

    /// Token value for the `Authorization: Bearer` header
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is still usable `skew` ahead of now
    pub fn is_fresh(&self, skew: Duration) -> bool {
        self.expires_at
            .is_none_or(|expires_at| Utc::now() + skew < expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces tokens for authenticating remote calls
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn token(&self) -> Result<AccessToken>;
}

/// Performs one token exchange against an identity endpoint
#[async_trait]
pub trait TokenFetcher: Send + Sync + fmt::Debug {
    async fn fetch(&self) -> Result<AccessToken>;
}

/// Caches the last fetched token until it is about to expire
#[derive(Debug)]
pub struct CachedTokenSource<F> {
    fetcher: F,
    skew: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl<F: TokenFetcher> CachedTokenSource<F> {
    pub fn new(fetcher: F, skew_secs: i64) -> Self {
        Self {
            fetcher,
            skew: Duration::seconds(skew_secs),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<F: TokenFetcher> TokenSource for CachedTokenSource<F> {
    async fn token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(self.skew)) {
            return Ok(token.clone());
        }
        let token = self.fetcher.fetch().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// OAuth2 token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub(crate) fn into_access_token(self) -> AccessToken {
        let expires_at = self
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        AccessToken::new(self.access_token, expires_at)
    }
}

/// Read a token endpoint response, mapping failures to `Auth` errors
pub(crate) async fn read_token_response(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<AccessToken> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Auth(format!(
            "token endpoint {endpoint} returned HTTP {status}: {body}"
        )));
    }
    let parsed: TokenResponse = response.json().await.map_err(|e| {
        ProviderError::Auth(format!("invalid token response from {endpoint}: {e}"))
    })?;
    Ok(parsed.into_access_token())
}
