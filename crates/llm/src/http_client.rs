//! HTTP Client Factory
//!
//! Builds the `reqwest::Client` used by provider adapters.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` with a per-request timeout.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("Failed to build HTTP client: {}", e),
        })
}
