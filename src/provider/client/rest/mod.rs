//! # Secret Manager REST Client
//!
//! Native REST implementation using reqwest with rustls.
//!
//! Every request carries a bearer token from the instance's token source.
//! Payloads are base64-encoded on the wire.
//!
//! Status mapping: 404 is `NotFound`, 401/403 is `Auth`, everything else is
//! `Transport` with the HTTP status attached.
//!
//! Logical keys may contain `/`, `?` or `#`, so each resource name is split
//! back into its segments and the key is percent-encoded as a single segment.

mod requests;
mod responses;

pub use requests::{AddVersionRequest, CreateSecretRequest};
pub use responses::{
    AccessSecretVersionResponse, ListSecretsResponse, SecretResponse, SecretVersionResponse,
};

use super::{ListSecretsPage, ListSecretsRequest, RemoteSecret, SecretManagerClient, SecretVersion};
use crate::auth::TokenSource;
use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use paths::{ACCOUNTS_COLLECTION, SECRETS_COLLECTION, VERSIONS_COLLECTION};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use responses::ErrorResponse;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client used for API and token calls
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::transport(format!("failed to create HTTP client: {e}")))
}

/// Secret Manager REST client bound to one token source
pub struct SecretManagerRest {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for SecretManagerRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManagerRest")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SecretManagerRest {
    pub fn new(endpoint: &str, http: reqwest::Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, segments: &[String]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        let token = self.tokens.token().await?;
        debug!(method = %method, url = %url, "Secret Manager request");
        Ok(self.http.request(method, url).bearer_auth(token.secret()))
    }

    /// Endpoint URL with `segments` appended, each one percent-encoded
    fn url(&self, segments: &[String]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Config(format!("invalid endpoint {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::Config(format!("endpoint {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> Result<T> {
        let response = request.send().await?;
        let response = check_status(response, resource).await?;
        response.json::<T>().await.map_err(|e| ProviderError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: format!("invalid response for {resource}: {e}"),
        })
    }
}

/// Map a non-2xx response to the error taxonomy
async fn check_status(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(ErrorResponse { error }) if !error.message.is_empty() => match error.status {
            Some(code) if !code.is_empty() => format!("{} ({code})", error.message),
            _ => error.message,
        },
        _ => body,
    };
    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(resource.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth(format!("{resource}: HTTP {status}: {message}"))
        }
        _ => ProviderError::Transport {
            status: Some(status.as_u16()),
            message: format!("{resource}: {message}"),
        },
    })
}

/// Segments of a secret name, or of an account name when no key is present
fn secret_segments(name: &str) -> Vec<String> {
    match paths::parse_secret_name(name) {
        Some((account, key)) => [ACCOUNTS_COLLECTION, account, SECRETS_COLLECTION, key]
            .map(str::to_string)
            .to_vec(),
        None => name.split('/').map(str::to_string).collect(),
    }
}

fn version_segments(name: &str) -> Vec<String> {
    match paths::parse_version_name(name) {
        Some((account, key, version)) => [
            ACCOUNTS_COLLECTION,
            account,
            SECRETS_COLLECTION,
            key,
            VERSIONS_COLLECTION,
            version,
        ]
        .map(str::to_string)
        .to_vec(),
        None => name.split('/').map(str::to_string).collect(),
    }
}

/// Secrets collection under an account name
fn collection_segments(account: &str) -> Vec<String> {
    let mut segments: Vec<String> = account.split('/').map(str::to_string).collect();
    segments.push(SECRETS_COLLECTION.to_string());
    segments
}

/// Append a custom method such as `:access` to the last segment
fn with_verb(mut segments: Vec<String>, verb: &str) -> Vec<String> {
    if let Some(last) = segments.last_mut() {
        last.push(':');
        last.push_str(verb);
    }
    segments
}

fn decode_payload(name: &str, data: &str) -> Result<Vec<u8>> {
    BASE64.decode(data).map_err(|e| {
        ProviderError::MalformedSecret(format!("{name} (payload is not valid base64: {e})"))
    })
}

#[async_trait]
impl SecretManagerClient for SecretManagerRest {
    async fn access_secret_version(&self, name: &str) -> Result<SecretVersion> {
        let request = self
            .request(Method::GET, &with_verb(version_segments(name), "access"))
            .await?;
        let response: AccessSecretVersionResponse = self.send(request, name).await?;
        let payload = match response.payload.and_then(|p| p.data) {
            Some(data) => Some(decode_payload(name, &data)?),
            None => None,
        };
        Ok(SecretVersion {
            name: response.name,
            payload,
        })
    }

    async fn get_secret(&self, name: &str) -> Result<RemoteSecret> {
        let request = self.request(Method::GET, &secret_segments(name)).await?;
        let response: SecretResponse = self.send(request, name).await?;
        Ok(RemoteSecret {
            name: response.name,
            labels: response.labels,
        })
    }

    async fn create_secret(
        &self,
        parent: &str,
        secret_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<RemoteSecret> {
        let request = self
            .request(Method::POST, &collection_segments(parent))
            .await?
            .query(&[("secretId", secret_id)])
            .json(&CreateSecretRequest::new(labels.clone()));
        let resource = format!("{parent}/{SECRETS_COLLECTION}/{secret_id}");
        let response: SecretResponse = self.send(request, &resource).await?;
        Ok(RemoteSecret {
            name: response.name,
            labels: response.labels,
        })
    }

    async fn add_secret_version(&self, parent: &str, payload: &[u8]) -> Result<SecretVersion> {
        let request = self
            .request(Method::POST, &with_verb(secret_segments(parent), "addVersion"))
            .await?
            .json(&AddVersionRequest::new(BASE64.encode(payload)));
        let response: SecretVersionResponse = self.send(request, parent).await?;
        Ok(SecretVersion {
            name: response.name,
            payload: None,
        })
    }

    async fn list_secrets_page(
        &self,
        request: &ListSecretsRequest,
        page_token: Option<&str>,
    ) -> Result<ListSecretsPage> {
        let mut query: Vec<(&str, String)> = vec![("pageSize", request.page_size.to_string())];
        if let Some(filter) = &request.filter {
            query.push(("filter", filter.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let builder = self
            .request(Method::GET, &collection_segments(&request.parent))
            .await?
            .query(&query);
        let response: ListSecretsResponse = self.send(builder, &request.parent).await?;
        Ok(ListSecretsPage {
            secrets: response
                .secrets
                .into_iter()
                .map(|s| RemoteSecret {
                    name: s.name,
                    labels: s.labels,
                })
                .collect(),
            next_page_token: response.next_page_token,
            total_size: response.total_size,
        })
    }

    // reqwest pools connections per client; dropping the client closes them
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
