//! Error types shared by every backend adapter

use thiserror::Error;

/// Result alias used across the adapter layer
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failures surfaced by configurators, searchers and uploaders.
///
/// Nothing in the adapter layer retries or recovers: each variant reaches the
/// caller unchanged.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Backend unreachable, handshake failed, or the transport broke mid-request
    #[error("connection to {backend} failed: {message}")]
    Connection { backend: String, message: String },

    /// Operation on a collection that does not exist
    #[error("collection '{0}' not found")]
    NotFound(String),

    /// Unmapped distance, malformed collection/search params, or params the
    /// backend rejected at creation time
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Filter condition could not be translated into a backend query
    #[error("invalid filter condition: {0}")]
    QueryConstruction(String),

    /// Backend answered with an error the taxonomy above does not cover
    #[error("{backend} API error {status}: {message}")]
    Backend {
        backend: String,
        status: u16,
        message: String,
    },

    /// Searcher or uploader used before `init_client`
    #[error("{0} client is not initialized; call init_client first")]
    NotInitialized(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    /// Wrap a transport error raised while talking to `backend`
    pub fn connection(backend: &str, err: reqwest::Error) -> Self {
        BenchError::Connection {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BenchError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BenchError::NotFound("benchmark".to_string());
        assert_eq!(err.to_string(), "collection 'benchmark' not found");
        assert!(err.is_not_found());

        let err = BenchError::Backend {
            backend: "Qdrant".to_string(),
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.to_string(), "Qdrant API error 400: bad request");
        assert!(!err.is_not_found());
    }
}
