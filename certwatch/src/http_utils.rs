//! HTTP utility functions for consistent error handling across API clients

use reqwest::Response;
use std::time::Duration;
use tracing::warn;

use crate::errors::{CertWatchError, CertWatchResult};

/// Build the shared HTTP client with a request timeout
pub fn build_client(timeout_seconds: u64) -> CertWatchResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(CertWatchError::from)
}

/// Turn non-success responses into `CertWatchError::Api`, logging the body
pub async fn handle_api_response(service: &str, response: Response) -> CertWatchResult<Response> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        warn!("{} API error: {} - {}", service, status, error_text);
        return Err(CertWatchError::Api {
            service: service.to_string(),
            status: status.as_u16(),
            message: error_text,
        });
    }
    Ok(response)
}

/// Parse JSON response with consistent error handling
pub async fn parse_json_response<T>(response: Response, context: &str) -> CertWatchResult<T>
where
    T: serde::de::DeserializeOwned,
{
    response.json().await.map_err(|e| CertWatchError::Serialization {
        format: "JSON".to_string(),
        message: format!("Failed to parse {}: {}", context, e),
    })
}
