//! Ollama Local LLM Provider
//!
//! LLM provider for locally-running Ollama models through `/api/chat`,
//! which accepts the same function-tool schema as OpenAI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    ChatMessage, ChatRequest, ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse,
    MessageRole, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage, ToolCall,
    ToolDefinition,
};
use crate::types::{InspectorError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const PROVIDER: &str = "ollama";

/// Ollama Local LLM Provider
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_base = Self::validate_endpoint(&api_base)?;

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
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Validate endpoint URL (SSRF prevention)
    ///
    /// Only allows http/https schemes and warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            InspectorError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(InspectorError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.model)
    }

    fn build_request(&self, request: &ChatRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model_for(request).to_string(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            tools: request.tools.iter().map(OllamaTool::from).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(self.temperature),
                num_predict: request.max_tokens.unwrap_or(self.max_tokens),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, messages: {})",
            self.model_for(request),
            request.messages.len()
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/api/chat", self.api_base);

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                LlmError::with_provider(
                    ErrorCategory::Network,
                    format!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    ),
                    PROVIDER,
                )
            } else {
                ErrorClassifier::classify(&e.to_string(), PROVIDER)
            }
        })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(
                ErrorClassifier::classify_http_status(status.as_u16(), &body, PROVIDER).into(),
            );
        }

        let response_body: OllamaChatResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse Ollama response: {}", e),
                PROVIDER,
            )
        })?;

        debug!("Received response from Ollama in {:?}", elapsed);
        Ok(parse_chat(response_body, self.model_for(request), elapsed))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(tags) = resp.json::<OllamaTagsResponse>().await {
                    let model_available = tags.models.iter().any(|m| {
                        m.name == self.model
                            || m.name.starts_with(&self.model.replace(":latest", ""))
                    });

                    if model_available {
                        info!("Ollama is available with model: {}", self.model);
                        Ok(true)
                    } else {
                        warn!(
                            "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                            self.model, self.model
                        );
                        Ok(false)
                    }
                } else {
                    info!("Ollama is available");
                    Ok(true)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

fn parse_chat(body: OllamaChatResponse, model: &str, elapsed: Duration) -> LlmResponse {
    let usage = TokenUsage::from_ollama(
        body.prompt_eval_count.unwrap_or(0),
        body.eval_count.unwrap_or(0),
    );

    // Ollama does not assign call IDs
    let tool_calls = body
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, call)| ToolCall {
            call_id: format!("call_{}", i),
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    LlmResponse {
        content: body.message.content,
        tool_calls,
        usage,
        timing: ResponseTiming::from_duration(elapsed),
        metadata: ResponseMetadata {
            model: model.to_string(),
            provider: PROVIDER.to_string(),
        },
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

impl From<&ChatMessage> for OllamaMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = match message.role {
            MessageRole::Assistant => message.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|call| OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
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
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ToolDefinition,
}

impl From<&ToolDefinition> for OllamaTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: tool.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            provider: "ollama".to_string(),
            model: Some("llama3.1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_endpoint() {
        let provider = OllamaProvider::new(config()).expect("Failed to create provider");
        assert_eq!(provider.api_base, DEFAULT_API_BASE);
        assert_eq!(provider.model, "llama3.1");
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let err = OllamaProvider::new(ProviderConfig {
            api_base: Some("file:///etc/passwd".to_string()),
            ..config()
        })
        .err()
        .unwrap();
        assert!(matches!(err, InspectorError::Config(_)));
    }

    #[test]
    fn test_parse_chat_assigns_call_ids() {
        let body: OllamaChatResponse = serde_json::from_value(serde_json::json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "get_actor_readme", "arguments": {"actor_name": "a/b"}}},
                    {"function": {"name": "get_platform_pricing", "arguments": {}}}
                ]
            },
            "prompt_eval_count": 40,
            "eval_count": 2
        }))
        .unwrap();

        let response = parse_chat(body, "llama3.1", Duration::from_millis(1));
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[1].call_id, "call_1");
        assert_eq!(response.tool_calls[0].arguments["actor_name"], "a/b");
        assert_eq!(response.usage.total(), 42);
    }

    #[test]
    fn test_build_request_carries_tools() {
        let provider = OllamaProvider::new(config()).unwrap();
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_tools(vec![
            ToolDefinition {
                name: "get_platform_pricing".to_string(),
                description: "Plans".to_string(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            },
        ]);
        let wire = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(wire["stream"], false);
        assert_eq!(wire["tools"][0]["function"]["name"], "get_platform_pricing");
    }
}
