//! actor-inspector - Multi-Agent Actor Quality Inspector
//!
//! Rates a published Apify Actor along four dimensions (code quality,
//! documentation, uniqueness, pricing) with a crew of LLM agents and
//! publishes a deterministic markdown report.
//!
//! ## Core Features
//!
//! - **Agent Crew**: five personas, each limited to the tools its task needs
//! - **Sequential Tasks**: every section sees the findings written before it
//! - **Gap Reporting**: unavailable metadata becomes a visible gap, not a crash
//! - **Billing**: run-start and task-completed charge events
//!
//! ## Quick Start
//!
//! ```ignore
//! use actor_inspector::{Config, InspectionPipeline, InspectionRequest, RunId};
//!
//! let request = InspectionRequest::from_input(&input, &config)?;
//! let pipeline = InspectionPipeline::new(config, provider, source, reports, charges);
//! let outcome = pipeline.run(RunId::generate(), &request).await?;
//! println!("{}", outcome.report.markdown);
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: request validation and the inspection run
//! - [`agents`]: agent personas and the tool-calling loop
//! - [`tasks`]: task definitions, prompts and rating extraction
//! - [`tools`]: metadata tools and the Apify API client
//! - [`report`]: report assembly and markdown rendering
//! - [`publish`]: report and charge sinks
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`ai`]: LLM provider abstraction, prompts, metrics and timeouts

pub mod agents;
pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod storage;
pub mod tasks;
pub mod tools;
pub mod types;

#[cfg(test)]
mod testing;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, SinkKind};

// Error Types
pub use types::error::{ErrorCategory, FailureKind, InspectorError, Result, ResultExt};
pub use types::{ActorId, RunId};

// Storage
pub use storage::database::PoolConfig;
pub use storage::{Database, SharedDatabase};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use agents::{AgentProfile, AgentRole};
pub use pipeline::{InspectionPipeline, InspectionRequest, RunOutcome};
pub use publish::{ChargeEvent, ChargeSink, ReportSink};
pub use report::{InspectionReport, TaskResult};
pub use tasks::{Rating, TaskCategory};
pub use tools::{ApifyClient, MetadataSource};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    LlmProvider, LlmResponse, MetricsCollector, ProviderConfig, SharedProvider, TimeoutConfig,
    create_provider, with_timeout,
};
