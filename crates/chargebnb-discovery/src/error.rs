use thiserror::Error;

/// Errors returned by the backend station client.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backend URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
