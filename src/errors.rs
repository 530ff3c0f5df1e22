//! # Provider Error Types
//!
//! Classified errors for credential resolution and remote secret operations.
//!
//! This layer never retries. Errors are classified so the caller's
//! reconciliation loop can decide on backoff.

use thiserror::Error;

/// Errors surfaced by the Secret Manager provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Malformed or missing store spec or selector (permanent)
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// Credential resolution or validation failed
    #[error("unable to get credentials: {0}")]
    Auth(String),

    /// Remote entry absent
    #[error("{0} not found")]
    NotFound(String),

    /// The remote secret is not labeled as owned by this system (permanent)
    #[error("secret {0} is not managed by external secrets")]
    NotManaged(String),

    /// Remote version carries no payload
    #[error("invalid secret received. no secret string for key: {0}")]
    MalformedSecret(String),

    /// Requested property does not resolve in the payload
    #[error("key {property} does not exist in secret {key}")]
    PropertyNotFound { key: String, property: String },

    /// Payload is not a JSON object where one is required
    #[error("unable to unmarshal secret {key}: {source}")]
    Unmarshal {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// No client or account id configured (never constructed, or already closed)
    #[error("provider is not initialized")]
    NotInitialized,

    /// A find query carried neither a name pattern nor tags
    #[error("unexpected find operator: a name pattern or tags are required")]
    UnsupportedQuery,

    /// Generic remote I/O failure
    #[error("remote call failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The ambient cancellation token fired while a remote call was in flight
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias used throughout the provider
pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether an outer loop may reasonably retry.
    ///
    /// Configuration, ownership and payload-shape errors never heal by
    /// themselves. Transport failures without a status, throttling and server
    /// errors may.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            Self::Cancelled => true,
            _ => false,
        }
    }

    /// Short reason string for metrics labels
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::NotManaged(_) => "not_managed",
            Self::MalformedSecret(_) => "malformed_secret",
            Self::PropertyNotFound { .. } => "property_not_found",
            Self::Unmarshal { .. } => "unmarshal",
            Self::NotInitialized => "not_initialized",
            Self::UnsupportedQuery => "unsupported_query",
            Self::Transport { .. } => "transport",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let throttled = ProviderError::Transport {
            status: Some(429),
            message: "quota".to_string(),
        };
        let denied = ProviderError::Transport {
            status: Some(400),
            message: "bad filter".to_string(),
        };
        assert!(throttled.is_transient());
        assert!(!denied.is_transient());
        assert!(ProviderError::transport("connection reset").is_transient());
    }

    #[test]
    fn test_permanent_errors_are_not_transient() {
        assert!(!ProviderError::NotManaged("db".to_string()).is_transient());
        assert!(!ProviderError::Config("missing".to_string()).is_transient());
        assert!(!ProviderError::UnsupportedQuery.is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = ProviderError::PropertyNotFound {
            key: "db/creds".to_string(),
            property: "pass".to_string(),
        };
        assert_eq!(err.to_string(), "key pass does not exist in secret db/creds");

        let err = ProviderError::Transport {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "remote call failed (HTTP 503): unavailable");
        assert_eq!(
            ProviderError::transport("reset").to_string(),
            "remote call failed: reset"
        );
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(ProviderError::NotInitialized.reason(), "not_initialized");
        assert!(ProviderError::NotFound("x".to_string()).is_not_found());
    }
}
