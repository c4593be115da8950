//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Failure Kinds
//!
//! - **Transport**: a metadata, storage or billing call failed outright (abort)
//! - **ModelInvocation**: the hosted model errored, timed out or answered garbage (abort)
//! - **Configuration**: input or configuration is invalid (abort before any task)
//! - **Storage**: local persistence failed (abort)
//!
//! A missing README, schema or pricing entry is *not* an error. Fetch tools
//! return an unavailable artifact instead, see [`crate::tools::FetchedArtifact`].

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories of model-service failures, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited or out of quota
    RateLimit,
    /// Context/token limit exceeded
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider or model unavailable
    Unavailable,
    /// Invalid request
    BadRequest,
    /// Response could not be understood
    ParseError,
    /// Temporary server issues
    Transient,
    /// Agent did not converge within the iteration cap
    IterationLimit,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::IterationLimit => write!(f, "ITERATION_LIMIT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Model invocation error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Create a new LLM error
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    /// Create error with provider context
    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a transport-level error message
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("quota")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("context length")
            || lower.contains("maximum context")
            || (lower.contains("token") && lower.contains("limit"))
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("unauthorized") || lower.contains("api key") {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("connect")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code returned by a model endpoint
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => {
                let lower = message.to_lowercase();
                if lower.contains("context length") || lower.contains("maximum context") {
                    LlmError::with_provider(ErrorCategory::TokenLimit, message, provider)
                } else {
                    LlmError::with_provider(ErrorCategory::BadRequest, message, provider)
                }
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Failure Kind
// =============================================================================

/// User-visible classification of a run-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    ModelInvocation,
    Configuration,
    Storage,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "TRANSPORT_FAILURE"),
            Self::ModelInvocation => write!(f, "MODEL_INVOCATION_FAILURE"),
            Self::Configuration => write!(f, "CONFIGURATION_ERROR"),
            Self::Storage => write!(f, "STORAGE_ERROR"),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum InspectorError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// Hosted model failure
    #[error("Model invocation failed: {0}")]
    Llm(LlmError),

    /// Metadata, gateway or billing call failed outright
    #[error("Transport failure ({service}): {message}")]
    Transport { service: String, message: String },

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),
}

impl From<LlmError> for InspectorError {
    fn from(err: LlmError) -> Self {
        InspectorError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, InspectorError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl InspectorError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a transport error for the named collaborator
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an LLM error with category
    pub fn llm_with_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Llm(LlmError::new(category, message))
    }

    /// Failure kind reported to the user when this error aborts a run
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Llm(_) | Self::Timeout { .. } => FailureKind::ModelInvocation,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Config(_) | Self::Yaml(_) => FailureKind::Configuration,
            Self::Io(_)
            | Self::Database(_)
            | Self::Json(_)
            | Self::Storage(_)
            | Self::ReportNotFound(_) => FailureKind::Storage,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| InspectorError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| InspectorError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::IterationLimit.to_string(), "ITERATION_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("You exceeded your current quota", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("error trying to connect: dns error", "ollama");
        assert_eq!(err.category, ErrorCategory::Network);
    }

    #[test]
    fn test_classify_unknown() {
        let err = ErrorClassifier::classify("Something weird happened", "test");
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let context = ErrorClassifier::classify_http_status(
            400,
            "This model's maximum context length is 128000 tokens",
            "test",
        );
        assert_eq!(context.category, ErrorCategory::TokenLimit);

        let server_error = ErrorClassifier::classify_http_status(503, "Overloaded", "test");
        assert_eq!(server_error.category, ErrorCategory::Transient);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_failure_kind_mapping() {
        let llm: InspectorError = LlmError::new(ErrorCategory::ParseError, "garbage").into();
        assert_eq!(llm.kind(), FailureKind::ModelInvocation);

        let timeout = InspectorError::timeout("task", Duration::from_secs(1));
        assert_eq!(timeout.kind(), FailureKind::ModelInvocation);

        let transport = InspectorError::transport("apify", "connection reset");
        assert_eq!(transport.kind(), FailureKind::Transport);
        assert_eq!(
            transport.to_string(),
            "Transport failure (apify): connection reset"
        );

        let config = InspectorError::Config("missing actor".to_string());
        assert_eq!(config.kind(), FailureKind::Configuration);
        assert_eq!(config.kind().to_string(), "CONFIGURATION_ERROR");
    }
}
