//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/actor-inspector/) and project (.actor-inspector/)
//! level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{agent, billing, models, network, platform, tools};
use crate::types::{InspectorError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Inspection behaviour
    pub inspection: InspectionConfig,

    /// Metadata API settings
    pub platform: PlatformConfig,

    /// Where reports and charges are written
    pub storage: StorageConfig,

    /// Billing event prices
    pub billing: BillingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            inspection: InspectionConfig::default(),
            platform: PlatformConfig::default(),
            storage: StorageConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `InspectorError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(InspectorError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 || self.llm.task_timeout_secs == 0 {
            return Err(InspectorError::Config(
                "LLM timeout_secs and task_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tool_iterations == 0 {
            return Err(InspectorError::Config(
                "LLM max_tool_iterations must be greater than 0".to_string(),
            ));
        }

        if self.llm.supported_models.is_empty() {
            return Err(InspectorError::Config(
                "LLM supported_models must not be empty".to_string(),
            ));
        }

        if !self.llm.is_supported(&self.llm.default_model) {
            return Err(InspectorError::Config(format!(
                "Default model '{}' is not in supported_models",
                self.llm.default_model
            )));
        }

        if !(1..=tools::SEARCH_MAX_LIMIT).contains(&self.inspection.search_limit) {
            return Err(InspectorError::Config(format!(
                "inspection.search_limit must be between 1 and {}, got {}",
                tools::SEARCH_MAX_LIMIT,
                self.inspection.search_limit
            )));
        }

        if self.billing.run_start_price_usd < 0.0 || self.billing.task_completed_price_usd < 0.0 {
            return Err(InspectorError::Config(
                "Billing prices must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (`openai` or `ollama`)
    pub provider: String,

    /// Override for the provider endpoint
    pub base_url: Option<String>,

    /// Model used when a request does not name one
    pub default_model: String,

    /// Models a request may select
    pub supported_models: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound for one agent task, including tool round-trips
    pub task_timeout_secs: u64,

    /// Model round-trips allowed per task
    pub max_tool_iterations: usize,

    /// Maximum generated tokens per call
    pub max_tokens: usize,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            default_model: models::DEFAULT_MODEL.to_string(),
            supported_models: models::SUPPORTED_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            task_timeout_secs: agent::TASK_TIMEOUT_SECS,
            max_tool_iterations: agent::MAX_TOOL_ITERATIONS,
            max_tokens: agent::MAX_RESPONSE_TOKENS,
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    pub fn is_supported(&self, model: &str) -> bool {
        self.supported_models.iter().any(|m| m == model)
    }
}

// =============================================================================
// Inspection Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Strict review when the request does not say otherwise
    pub pedantic: bool,

    /// Token budget for the code context tool
    pub code_context_max_tokens: usize,

    /// Default page size for related Actor searches
    pub search_limit: u32,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            pedantic: true,
            code_context_max_tokens: tools::CODE_CONTEXT_MAX_TOKENS,
            search_limit: tools::SEARCH_DEFAULT_LIMIT,
        }
    }
}

// =============================================================================
// Platform Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform API base URL
    pub api_base: String,

    /// Repository-to-JSON gateway used for the code fallback
    pub gateway_url: String,

    /// Metadata request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: platform::DEFAULT_API_BASE.to_string(),
            gateway_url: tools::REPO_GATEWAY_URL.to_string(),
            timeout_secs: network::METADATA_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Destination for reports or billing events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Local SQLite database
    #[default]
    Local,
    /// Platform dataset / charge endpoint
    Platform,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Local => write!(f, "local"),
            SinkKind::Platform => write!(f, "platform"),
        }
    }
}

impl std::str::FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(SinkKind::Local),
            "platform" => Ok(SinkKind::Platform),
            _ => Err(format!(
                "Unknown sink: {}. Valid values: local, platform",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path for local sinks and history
    pub database_path: PathBuf,

    /// Report destination
    pub report_sink: SinkKind,

    /// Billing destination
    pub charge_sink: SinkKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".actor-inspector/inspector.db"),
            report_sink: SinkKind::Local,
            charge_sink: SinkKind::Local,
        }
    }
}

// =============================================================================
// Billing Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Price of one run-start unit (per started GB of memory)
    pub run_start_price_usd: f64,

    /// Price of one completed inspection
    pub task_completed_price_usd: f64,

    /// Memory of the run in megabytes, when not reported by the platform
    pub memory_mbytes: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            run_start_price_usd: billing::RUN_START_PRICE_USD,
            task_completed_price_usd: billing::TASK_COMPLETED_PRICE_USD,
            memory_mbytes: billing::DEFAULT_MEMORY_MBYTES,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.default_model, "gpt-4o-mini");
        assert!(config.inspection.pedantic);
        assert_eq!(config.storage.report_sink, SinkKind::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("local".parse::<SinkKind>().unwrap(), SinkKind::Local);
        assert_eq!("Platform".parse::<SinkKind>().unwrap(), SinkKind::Platform);
        assert!("s3".parse::<SinkKind>().is_err());
        assert_eq!(SinkKind::Platform.to_string(), "platform");
    }

    #[test]
    fn test_validate_rejects_unsupported_default_model() {
        let mut config = Config::default();
        config.llm.default_model = "model-Z".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("model-Z"));
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut config = Config::default();
        config.llm.max_tool_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_temperature_out_of_range() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_search_limit() {
        let mut config = Config::default();
        config.inspection.search_limit = 0;
        assert!(config.validate().is_err());
        config.inspection.search_limit = 101;
        assert!(config.validate().is_err());
    }
}
