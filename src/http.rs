//! HTTP utilities shared by the backend adapters

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{BenchError, Result};

/// Default request timeout when connection params don't set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create a reqwest client with connection pooling and sensible defaults
///
/// The client is configured with:
/// - Connection pooling (max 10 idle connections per host)
/// - Request timeout of `timeout_secs`
/// - 30 second connect timeout
pub fn create_client(backend: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BenchError::connection(backend, e))
}

/// Check HTTP response status and return a detailed error if not successful
///
/// The error detail is pulled out of the JSON body when the backend sends one.
pub async fn check_response(response: Response, backend: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    Err(BenchError::Backend {
        backend: backend.to_string(),
        status,
        message: error_detail(body),
    })
}

/// Extract the most specific message from an error body
///
/// Qdrant reports `{"status": {"error": "..."}}`, Weaviate
/// `{"error": [{"message": "..."}]}`; anything else is returned verbatim.
pub fn error_detail(body: String) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) else {
        return body;
    };

    json.get("status")
        .and_then(|s| s.get("error"))
        .and_then(|e| e.as_str())
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get(0))
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        })
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .map(|s| s.to_string())
        .unwrap_or(body)
}
