//! Request Executor
//!
//! Executes one `TestStep` against the service: placeholder substitution,
//! dispatch with a hard timeout, response parsing and validation. Network
//! failures become a failed `StepResult`, never an error.

use std::time::Duration;

use project_translator_core::{CoreError, CoreResult};
use serde_json::Value;

use crate::models::{HttpMethod, StepResult, TestStep};
use crate::placeholders::SavedData;

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of validating one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseValidation {
    pub success: bool,
    pub content_match: bool,
    pub errors: Vec<String>,
}

/// Validate status and content.
///
/// The status check always runs. At most one content rule is evaluated, the
/// first present in this order: `expected_response`, `expected_response_contains`,
/// `expected_response_type`, `expected_min_items`, `expected_items`.
pub fn validate_response(step: &TestStep, status: u16, body: &Value) -> ResponseValidation {
    let mut errors = Vec::new();

    let status_match = status == step.expected_status;
    if !status_match {
        errors.push(format!(
            "Status code mismatch: expected {}, got {}",
            step.expected_status, status
        ));
    }

    let content_match = if let Some(expected) = &step.expected_response {
        let matched = body
            .as_object()
            .map(|obj| {
                expected
                    .iter()
                    .all(|(k, v)| obj.get(k).is_some_and(|actual| values_equal(actual, v)))
            })
            .unwrap_or(false);
        if !matched {
            errors.push("Response content does not match expected values".to_string());
        }
        matched
    } else if let Some(keys) = &step.expected_response_contains {
        let matched = match body {
            Value::Object(obj) => keys.iter().all(|k| obj.contains_key(k)),
            Value::String(text) => keys.iter().all(|k| text.contains(k.as_str())),
            _ => false,
        };
        if !matched {
            errors.push("Response does not contain expected keys".to_string());
        }
        matched
    } else if let Some(expected_type) = step.expected_response_type {
        let matched = expected_type.matches(body);
        if !matched {
            errors.push(format!("Response type mismatch: expected {}", expected_type));
        }
        matched
    } else if let Some(min) = step.expected_min_items {
        let matched = body
            .as_array()
            .map(|items| items.len() as u64 >= min)
            .unwrap_or(false);
        if !matched {
            errors.push(format!(
                "Response has fewer items than expected minimum: {}",
                min
            ));
        }
        matched
    } else if let Some(count) = step.expected_items {
        let matched = body
            .as_array()
            .map(|items| items.len() as u64 == count)
            .unwrap_or(false);
        if !matched {
            errors.push(format!("Response item count mismatch: expected {}", count));
        }
        matched
    } else {
        true
    };

    ResponseValidation {
        success: status_match && content_match,
        content_match,
        errors,
    }
}

/// JSON equality where numbers compare by value, so `10` equals `10.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            x.as_f64() == y.as_f64()
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// HTTP step executor bound to one base URL.
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl RequestExecutor {
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute `step` (1-based `step_number`), reading and updating `saved`.
    pub async fn execute(&self, step: &TestStep, step_number: usize, saved: &mut SavedData) -> StepResult {
        let endpoint = saved.substitute(&step.endpoint);
        let url = format!("{}{}", self.base_url, endpoint);
        let body = step.body.as_ref().map(|b| saved.substitute_value(b));

        let mut request = match step.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Delete => self.client.delete(&url),
            HttpMethod::Post | HttpMethod::Put => {
                let builder = if step.method == HttpMethod::Post {
                    self.client.post(&url)
                } else {
                    self.client.put(&url)
                };
                match &body {
                    Some(b) => builder.json(b),
                    None => builder,
                }
            }
            other => {
                return StepResult::failed(
                    step,
                    step_number,
                    format!("Unsupported HTTP method: {}", other),
                );
            }
        };
        for (name, value) in step.headers.iter().flatten() {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(method = %step.method, url = %url, step = %step.name, "executing step");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(step = %step.name, error = %e, "request failed");
                return StepResult::failed(step, step_number, e.to_string());
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return StepResult::failed(step, step_number, e.to_string()),
        };
        let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        let validation = validate_response(step, status, &data);

        if validation.success {
            if let (Some(field), Some(id)) = (
                step.save_response_field.as_deref(),
                data.as_object().and_then(|obj| obj.get("id")),
            ) {
                tracing::debug!(field, id = %id, "saved response id");
                saved.insert(field, id.clone());
            }
        }

        StepResult {
            step_name: step.name.clone(),
            step_number,
            success: validation.success,
            status_code: Some(status),
            expected_status: step.expected_status,
            response_data: Some(data),
            content_match: validation.content_match,
            saved_field: step.save_response_field.clone(),
            validation_errors: validation.errors,
            error: None,
        }
    }
}
