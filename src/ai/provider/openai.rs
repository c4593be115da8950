//! OpenAI API Provider
//!
//! LLM provider using OpenAI's Chat Completions API with function tools.
//! Any OpenAI-compatible endpoint works through `llm.base_url`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    ChatMessage, ChatRequest, ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse,
    MessageRole, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage, ToolCall,
    ToolDefinition, decode_arguments,
};
use crate::types::{InspectorError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                InspectorError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var".to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = config
            .model
            .unwrap_or_else(|| crate::constants::models::DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                InspectorError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.model)
    }

    fn build_request(&self, request: &ChatRequest) -> ChatCompletionRequest {
        let model = self.model_for(request);
        let temperature =
            accepts_temperature(model).then(|| request.temperature.unwrap_or(self.temperature));

        ChatCompletionRequest {
            model: model.to_string(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature,
            max_completion_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            tools: request.tools.iter().map(WireTool::from).collect(),
        }
    }
}

/// Reasoning models reject a sampling temperature
fn accepts_temperature(model: &str) -> bool {
    !(model.starts_with("o1") || model.starts_with("o3"))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        info!(
            "Generating with OpenAI (model: {}, messages: {}, tools: {})",
            self.model_for(request),
            request.messages.len(),
            request.tools.len()
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify(&e.to_string(), PROVIDER))?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(
                ErrorClassifier::classify_http_status(status.as_u16(), &body, PROVIDER).into(),
            );
        }

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse OpenAI response: {}", e),
                PROVIDER,
            )
        })?;

        debug!("Received response from OpenAI in {:?}", elapsed);
        parse_completion(response_body, self.model_for(request), elapsed)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn parse_completion(
    body: ChatCompletionResponse,
    model: &str,
    elapsed: Duration,
) -> Result<LlmResponse> {
    let usage = body
        .usage
        .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    let message = body.choices.into_iter().next().map(|c| c.message).ok_or_else(|| {
        LlmError::with_provider(
            ErrorCategory::ParseError,
            "No choices in OpenAI response",
            PROVIDER,
        )
    })?;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            call_id: call.id,
            name: call.function.name,
            arguments: decode_arguments(&call.function.arguments),
        })
        .collect();

    Ok(LlmResponse {
        content: message.content.unwrap_or_default(),
        tool_calls,
        usage,
        timing: ResponseTiming::from_duration(elapsed),
        metadata: ResponseMetadata {
            model: model.to_string(),
            provider: PROVIDER.to_string(),
        },
    })
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = match message.role {
            MessageRole::Assistant => message.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.call_id.clone(),
                        call_type: "function".to_string(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: match &call.arguments {
                                Value::String(raw) => raw.clone(),
                                other => other.to_string(),
                            },
                        },
                    })
                    .collect()
            }),
            _ => None,
        };

        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default)]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            provider: "openai".to_string(),
            model: Some(model.to_string()),
            api_key: Some("sk-test".to_string()),
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", provider("gpt-4o-mini"));
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_build_request_with_tools() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("sys"),
            ChatMessage::assistant_with_tools(
                "",
                vec![ToolCall {
                    call_id: "call_1".to_string(),
                    name: "get_actor_readme".to_string(),
                    arguments: serde_json::json!({"actor_name": "a/b"}),
                }],
            ),
            ChatMessage::tool_response("call_1", "readme"),
        ])
        .with_tools(vec![ToolDefinition {
            name: "get_actor_readme".to_string(),
            description: "Fetch README".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }]);

        let wire = serde_json::to_value(provider("gpt-4o-mini").build_request(&request)).unwrap();
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["messages"][1]["tool_calls"][0]["function"]["name"], "get_actor_readme");
        assert_eq!(
            wire["messages"][1]["tool_calls"][0]["function"]["arguments"],
            r#"{"actor_name":"a/b"}"#
        );
        assert_eq!(wire["messages"][2]["tool_call_id"], "call_1");
        assert_eq!(wire["temperature"], 0.0);
    }

    #[test]
    fn test_reasoning_model_omits_temperature() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let wire = serde_json::to_value(provider("o3-mini").build_request(&request)).unwrap();
        assert!(wire.get("temperature").is_none());
        assert!(wire.get("tools").is_none());
    }

    #[test]
    fn test_request_model_overrides_configured_model() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_model("o1-mini");
        let wire = serde_json::to_value(provider("gpt-4o-mini").build_request(&request)).unwrap();
        assert_eq!(wire["model"], "o1-mini");
        assert!(wire.get("temperature").is_none());
    }

    #[test]
    fn test_parse_completion_with_tool_calls() {
        let body: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "search_related_actors", "arguments": "{\"search\":\"maps\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }))
        .unwrap();

        let response = parse_completion(body, "gpt-4o-mini", Duration::from_millis(5)).unwrap();
        assert!(response.content.is_empty());
        assert_eq!(response.tool_calls[0].call_id, "call_9");
        assert_eq!(response.tool_calls[0].arguments["search"], "maps");
        assert_eq!(response.usage.total(), 15);
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let body: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        let err = parse_completion(body, "gpt-4o-mini", Duration::ZERO).unwrap_err();
        assert!(matches!(
            err,
            InspectorError::Llm(LlmError { category: ErrorCategory::ParseError, .. })
        ));
    }
}
