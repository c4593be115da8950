//! AI Integration Layer
//!
//! Hosted model access for the inspection agents: provider abstraction,
//! prompt assembly, run metrics and timeouts.

pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use metrics::{MetricsCollector, MetricsSummary, TaskMetrics};
pub use provider::{
    ChatMessage, ChatRequest, LlmProvider, LlmResponse, MessageRole, ProviderConfig,
    SharedProvider, TokenUsage, ToolCall, ToolDefinition, create_provider,
};
pub use timeout::{TimeoutConfig, with_fetch_timeout, with_timeout};
