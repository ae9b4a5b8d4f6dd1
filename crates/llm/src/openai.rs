//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI's chat-completions API
//! and any OpenAI-compatible endpoint (local servers included).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    ConversationMessage, LlmError, LlmResponse, LlmResult, MessageBody, ProviderConfig,
    ProviderType, ToolDefinition, UsageStats,
};
use crate::http_client::build_http_client;

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default endpoint for local OpenAI-compatible servers (Ollama)
const LOCAL_API_URL: &str = "http://localhost:11434/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        if config.provider == ProviderType::Anthropic {
            return Err(LlmError::ProviderUnavailable {
                message: "anthropic is not supported by this build".to_string(),
            });
        }
        let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    /// Get the chat-completions URL
    fn endpoint(&self) -> String {
        match self.config.base_url.as_deref() {
            Some(base) if base.ends_with("/chat/completions") => base.to_string(),
            Some(base) => format!("{}/chat/completions", base.trim_end_matches('/')),
            None if self.config.provider == ProviderType::Local => LOCAL_API_URL.to_string(),
            None => OPENAI_API_URL.to_string(),
        }
    }

    fn api_key(&self) -> LlmResult<Option<&str>> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ if self.config.provider == ProviderType::Local => Ok(None),
            _ => Err(missing_api_key_error("openai")),
        }
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let mut openai_messages: Vec<serde_json::Value> = Vec::new();
        for msg in messages {
            match &msg.body {
                MessageBody::System { content } => openai_messages.push(serde_json::json!({
                    "role": "system",
                    "content": content
                })),
                MessageBody::User { content } => openai_messages.push(serde_json::json!({
                    "role": "user",
                    "content": content
                })),
                MessageBody::Assistant { content } => openai_messages.push(serde_json::json!({
                    "role": "assistant",
                    "content": content
                })),
                MessageBody::ToolCall {
                    name,
                    arguments,
                    call_id,
                } => {
                    let arguments = match arguments {
                        serde_json::Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    let call = serde_json::json!({
                        "id": call_id,
                        "type": "function",
                        "function": { "name": name, "arguments": arguments }
                    });
                    // The API returns text and tool calls in one assistant message.
                    match openai_messages.last_mut() {
                        Some(last) if last["role"] == "assistant" => {
                            if let Some(calls) = last["tool_calls"].as_array_mut() {
                                calls.push(call);
                            } else {
                                last["tool_calls"] = serde_json::json!([call]);
                            }
                        }
                        _ => openai_messages.push(serde_json::json!({
                            "role": "assistant",
                            "content": serde_json::Value::Null,
                            "tool_calls": [call]
                        })),
                    }
                }
                MessageBody::ToolResult { content, .. } => openai_messages.push(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": msg.id,
                    "content": content
                })),
            }
        }
        body["messages"] = serde_json::json!(openai_messages);

        if !tools.is_empty() {
            let openai_tools: Vec<serde_json::Value> =
                tools.iter().map(|t| self.tool_to_openai(t)).collect();
            body["tools"] = serde_json::json!(openai_tools);
        }

        body
    }

    /// Convert a ToolDefinition to OpenAI API format
    fn tool_to_openai(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema
            }
        })
    }

    /// Parse a response from OpenAI API
    fn parse_response(&self, response: &OpenAIResponse) -> LlmResponse {
        let mut messages = Vec::new();

        if let Some(msg) = response.choices.first().and_then(|c| c.message.as_ref()) {
            if let Some(content) = msg.content.as_deref().filter(|c| !c.trim().is_empty()) {
                messages.push(ConversationMessage::assistant(content));
            }
            for tc in msg.tool_calls.iter().flatten() {
                // Undecodable arguments stay as a raw string so dispatch can
                // report a tool error instead of failing the round-trip.
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or_else(|_| serde_json::Value::String(tc.function.arguments.clone()));
                messages.push(ConversationMessage::tool_call(
                    &tc.id,
                    &tc.function.name,
                    arguments,
                ));
            }
        }

        let usage = response.usage.as_ref().map(|u| UsageStats {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        LlmResponse { messages, usage }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        match self.config.provider {
            ProviderType::Local => "local",
            _ => "openai",
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send(
        &self,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> LlmResult<LlmResponse> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(messages, tools);

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        tracing::debug!(
            model = %openai_response.model,
            choices = openai_response.choices.len(),
            "received chat completion"
        );

        Ok(self.parse_response(&openai_response))
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
