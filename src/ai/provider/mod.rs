//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for tool-calling chat completions.
//! All providers return `LlmResponse` with token usage metrics for cost tracking.
//!
//! ## Modules
//!
//! - `types`: conversation, tool-call and usage types shared by all providers
//! - `openai`: OpenAI-compatible Chat Completions with function tools
//! - `ollama`: local Ollama `/api/chat`

mod ollama;
mod openai;
mod types;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use types::{
    ChatMessage, ChatRequest, LlmResponse, MessageRole, ResponseMetadata, ResponseTiming,
    TokenUsage, ToolCall, ToolDefinition,
};

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{InspectorError, Result};

/// Shared LLM provider type for concurrent access across pipeline stages.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are never serialized and are redacted in debug output. Each
/// provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation
    pub temperature: f32,
    /// API key, never serialized to output
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    /// Provider settings for one run of `model`
    pub fn from_llm_config(config: &LlmConfig, model: &str) -> Self {
        Self {
            provider: config.provider.clone(),
            model: Some(model.to_string()),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
            api_key: None,
            api_base: config.base_url.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from_llm_config(&LlmConfig::default(), crate::constants::models::DEFAULT_MODEL)
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Chat-completion provider with function-tool support
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and return the next assistant turn
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(InspectorError::Config(format!(
            "Unknown provider: {}. Supported: openai, ollama",
            config.provider
        ))),
    }
}

/// Decode a model-produced argument string, keeping undecodable text as a
/// JSON string so the caller can report it back to the model.
pub(crate) fn decode_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
