//! # Ambient Credentials
//!
//! Last strategy of the chain: the environment's implicit credentials, scoped
//! to the platform-wide access role.
//!
//! The default implementation reads a service account key file when
//! `GOOGLE_APPLICATION_CREDENTIALS` is set, and otherwise asks the instance
//! metadata server. Hosts can plug their own [`AmbientCredentialProvider`].

use super::service_account::{ServiceAccountCredentials, ServiceAccountFetcher};
use super::token::{read_token_response, AccessToken, CachedTokenSource, TokenFetcher, TokenSource};
use crate::config::ClientConfig;
use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Source of the environment's implicit credentials
#[async_trait]
pub trait AmbientCredentialProvider: Send + Sync + fmt::Debug {
    /// Token source for `scope`
    async fn token_source(&self, scope: &str) -> Result<Arc<dyn TokenSource>>;
}

/// Key file if configured, metadata server otherwise
#[derive(Debug, Clone)]
pub struct DefaultCredentials {
    application_credentials: Option<String>,
    metadata_host: String,
    skew_secs: i64,
    http: reqwest::Client,
}

impl DefaultCredentials {
    pub fn new(config: &ClientConfig, http: reqwest::Client) -> Self {
        Self {
            application_credentials: config.application_credentials.clone(),
            metadata_host: config.metadata_host.clone(),
            skew_secs: config.token_expiry_skew_secs,
            http,
        }
    }
}

#[async_trait]
impl AmbientCredentialProvider for DefaultCredentials {
    async fn token_source(&self, scope: &str) -> Result<Arc<dyn TokenSource>> {
        if let Some(path) = &self.application_credentials {
            debug!(path = %path, "Using application default credentials key file");
            let blob = tokio::fs::read(path).await.map_err(|e| {
                ProviderError::Auth(format!("unable to read credentials file {path}: {e}"))
            })?;
            let credentials = ServiceAccountCredentials::from_json(&blob)?;
            let fetcher = ServiceAccountFetcher::new(credentials, scope, self.http.clone());
            return Ok(Arc::new(CachedTokenSource::new(fetcher, self.skew_secs)));
        }
        debug!(host = %self.metadata_host, "Using metadata server credentials");
        let fetcher = MetadataServerFetcher::new(&self.metadata_host, scope, self.http.clone());
        Ok(Arc::new(CachedTokenSource::new(fetcher, self.skew_secs)))
    }
}

/// Default service account token from the instance metadata server
#[derive(Debug)]
pub struct MetadataServerFetcher {
    url: String,
    http: reqwest::Client,
}

impl MetadataServerFetcher {
    pub fn new(metadata_host: &str, scope: &str, http: reqwest::Client) -> Self {
        let base = if metadata_host.starts_with("http://") || metadata_host.starts_with("https://")
        {
            metadata_host.trim_end_matches('/').to_string()
        } else {
            format!("http://{metadata_host}")
        };
        Self {
            url: format!(
                "{base}/computeMetadata/v1/instance/service-accounts/default/token?scopes={scope}"
            ),
            http,
        }
    }
}

#[async_trait]
impl TokenFetcher for MetadataServerFetcher {
    async fn fetch(&self) -> Result<AccessToken> {
        let response = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ProviderError::Auth(format!("metadata server unreachable: {e}")))?;
        read_token_response(response, &self.url).await
    }
}
