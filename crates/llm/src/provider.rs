//! LLM Provider Trait
//!
//! Defines the single contract the translation engines need from a provider:
//! send the whole conversation plus the tool catalog, get back the messages to
//! append.

use std::sync::Arc;

use async_trait::async_trait;

use super::openai::OpenAIProvider;
use super::types::{
    ConversationMessage, LlmError, LlmResponse, LlmResult, ProviderConfig, ProviderType,
    ToolDefinition,
};

/// Trait that all LLM providers must implement.
///
/// Providers surface every failure as an `LlmError`; callers decide whether a
/// failure ends the session or is fed back into the conversation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send the conversation and get the model's reply.
    ///
    /// # Arguments
    /// * `messages` - Full conversation history, tool calls answered
    /// * `tools` - Tool catalog; empty for single-shot requests
    async fn send(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> LlmResult<LlmResponse>;
}

/// Construct the provider named by `config`.
///
/// OpenAI and local servers share the OpenAI-compatible adapter.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        ProviderType::OpenAI | ProviderType::Local => Ok(Arc::new(OpenAIProvider::new(config)?)),
        ProviderType::Anthropic => Err(LlmError::ProviderUnavailable {
            message: "anthropic is not supported by this build".to_string(),
        }),
    }
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
