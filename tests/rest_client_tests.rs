//! # REST Transport Tests
//!
//! Exercises the Secret Manager REST client against a mock HTTP server.
//!
//! These tests verify:
//! - Bearer token and resource paths on every request
//! - Logical keys percent-encoded as a single path segment
//! - Base64 payload decoding and encoding
//! - Status code classification
//! - Pagination through the listing API, ending on a repeated page token

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use secretmanager_provider::auth::{AccessToken, TokenSource};
use secretmanager_provider::provider::client::rest::build_http_client;
use secretmanager_provider::provider::client::list_secrets;
use secretmanager_provider::provider::{ListSecretsRequest, SecretManagerClient, SecretManagerRest};
use secretmanager_provider::ProviderError;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct FixedToken;

#[async_trait]
impl TokenSource for FixedToken {
    async fn token(&self) -> secretmanager_provider::Result<AccessToken> {
        Ok(AccessToken::new("test-token", None))
    }
}

fn client(server: &MockServer) -> SecretManagerRest {
    let http = build_http_client(5).expect("http client");
    SecretManagerRest::new(&format!("{}/v1/", server.uri()), http, Arc::new(FixedToken))
}

#[tokio::test]
async fn test_access_decodes_payload_and_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets/db%2Fcreds/versions/latest:access"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/918273645/secrets/db/creds/versions/3",
            "payload": { "data": BASE64.encode(br#"{"user":"a"}"#) }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let version = client(&server)
        .access_secret_version("accounts/p1/secrets/db/creds/versions/latest")
        .await
        .expect("access");
    assert_eq!(version.name, "accounts/918273645/secrets/db/creds/versions/3");
    assert_eq!(version.payload.as_deref(), Some(br#"{"user":"a"}"#.as_slice()));
}

#[tokio::test]
async fn test_access_without_payload_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets/empty/versions/1:access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/empty/versions/1"
        })))
        .mount(&server)
        .await;

    let version = client(&server)
        .access_secret_version("accounts/p1/secrets/empty/versions/1")
        .await
        .expect("access");
    assert!(version.payload.is_none());
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let server = MockServer::start().await;
    for (key, status) in [("missing", 404_u16), ("denied", 403), ("expired", 401), ("busy", 503)] {
        Mock::given(method("GET"))
            .and(path(format!("/v1/accounts/p1/secrets/{key}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": format!("{key} says no"), "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;
    }
    let client = client(&server);

    let err = client.get_secret("accounts/p1/secrets/missing").await.expect_err("404");
    assert!(err.is_not_found());

    let err = client.get_secret("accounts/p1/secrets/denied").await.expect_err("403");
    assert!(matches!(err, ProviderError::Auth(_)));
    let err = client.get_secret("accounts/p1/secrets/expired").await.expect_err("401");
    assert!(matches!(err, ProviderError::Auth(_)));

    let err = client.get_secret("accounts/p1/secrets/busy").await.expect_err("503");
    assert!(matches!(err, ProviderError::Transport { status: Some(503), .. }));
    assert!(err.is_transient());
    assert!(err.to_string().contains("busy says no (UNAVAILABLE)"));
}

#[tokio::test]
async fn test_reserved_characters_in_key_stay_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets/app%2Fq%3F%23frag/versions/2:access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/app/q?#frag/versions/2",
            "payload": { "data": BASE64.encode(b"v") }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets/app%2Fq%3F%23frag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/app/q?#frag",
            "labels": { "managed-by": "external-secrets" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/p1/secrets/app%2Fq%3F%23frag:addVersion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/app/q?#frag/versions/3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let key = "app/q?#frag";
    let version = client
        .access_secret_version(&paths::version_name("p1", key, "2"))
        .await
        .expect("access");
    assert_eq!(version.payload.as_deref(), Some(b"v".as_slice()));
    let secret = client
        .get_secret(&paths::secret_name("p1", key))
        .await
        .expect("get");
    assert_eq!(paths::logical_key(&secret.name), key);
    client
        .add_secret_version(&paths::secret_name("p1", key), b"w")
        .await
        .expect("add version");
}

#[tokio::test]
async fn test_create_sends_labels_and_automatic_replication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/p1/secrets"))
        .and(query_param("secretId", "db/creds"))
        .and(body_json(json!({
            "replication": { "automatic": {} },
            "labels": { "managed-by": "external-secrets" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/db/creds",
            "labels": { "managed-by": "external-secrets" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let labels = BTreeMap::from([("managed-by".to_string(), "external-secrets".to_string())]);
    let secret = client(&server)
        .create_secret("accounts/p1", "db/creds", &labels)
        .await
        .expect("create");
    assert_eq!(secret.labels, labels);
}

#[tokio::test]
async fn test_add_version_encodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/p1/secrets/k:addVersion"))
        .and(body_json(json!({ "payload": { "data": BASE64.encode(b"s3cr3t") } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/k/versions/2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let version = client(&server)
        .add_secret_version("accounts/p1/secrets/k", b"s3cr3t")
        .await
        .expect("add version");
    assert_eq!(version.name, "accounts/p1/secrets/k/versions/2");
}

#[tokio::test]
async fn test_listing_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets"))
        .and(query_param("filter", "labels.env=prod"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [
                { "name": "accounts/p1/secrets/a", "labels": { "env": "prod" } },
                { "name": "accounts/p1/secrets/b", "labels": { "env": "prod" } }
            ],
            "nextPageToken": "page-2",
            "totalSize": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [ { "name": "accounts/p1/secrets/c" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut secrets = list_secrets(
        &client,
        ListSecretsRequest {
            parent: "accounts/p1".to_string(),
            filter: Some("labels.env=prod".to_string()),
            page_size: 2,
        },
    );
    let mut names = Vec::new();
    while let Some(secret) = secrets.next().await.expect("page") {
        names.push(secret.name);
    }
    assert_eq!(
        names,
        vec![
            "accounts/p1/secrets/a",
            "accounts/p1/secrets/b",
            "accounts/p1/secrets/c"
        ]
    );
    assert_eq!(secrets.pages(), 2);
}

#[tokio::test]
async fn test_listing_stops_on_repeated_page_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [ { "name": "accounts/p1/secrets/a" } ],
            "nextPageToken": "again"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets"))
        .and(query_param("pageToken", "again"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [ { "name": "accounts/p1/secrets/b" } ],
            "nextPageToken": "again"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut secrets = list_secrets(
        &client,
        ListSecretsRequest {
            parent: "accounts/p1".to_string(),
            filter: None,
            page_size: 1,
        },
    );
    let mut names = Vec::new();
    while let Some(secret) = secrets.next().await.expect("page") {
        names.push(secret.name);
    }
    assert_eq!(names, vec!["accounts/p1/secrets/a", "accounts/p1/secrets/b"]);
    assert_eq!(secrets.pages(), 2);
}

#[tokio::test]
async fn test_invalid_base64_is_malformed_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/p1/secrets/k/versions/latest:access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "accounts/p1/secrets/k/versions/1",
            "payload": { "data": "not base64!!" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .access_secret_version("accounts/p1/secrets/k/versions/latest")
        .await
        .expect_err("bad payload");
    assert!(matches!(err, ProviderError::MalformedSecret(_)));
}
