//! Unified Timeout Configuration
//!
//! Timeout budgets for the collaborators of a run, plus helpers that wrap
//! an async operation and turn expiry into an error of the right kind:
//!
//! - [`with_timeout`]: model work, expiry is `InspectorError::Timeout`
//! - [`with_fetch_timeout`]: metadata calls, expiry is `InspectorError::Transport`
//!
//! Single model HTTP requests are bounded by the provider's own client
//! timeout (`llm.timeout_secs`).
//!
//! ## Usage
//!
//! ```ignore
//! let timeouts = TimeoutConfig::from_config(&config);
//! let result = with_timeout(timeouts.agent_task, run_task(), "code_quality task").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{agent, network};
use crate::types::{InspectorError, Result};

/// Timeout budgets for one run
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// One metadata fetch, including every request it makes
    pub metadata_request: Duration,
    /// Agent loop of one task, including its tool round-trips
    pub agent_task: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata_request: Duration::from_secs(network::METADATA_TIMEOUT_SECS),
            agent_task: Duration::from_secs(agent::TASK_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            metadata_request: Duration::from_secs(config.platform.timeout_secs),
            agent_task: Duration::from_secs(config.llm.task_timeout_secs),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(InspectorError::timeout(operation_name, timeout)),
    }
}

/// Execute a metadata fetch with a timeout
///
/// Expiry is a transport failure of `service`, never a model failure.
pub async fn with_fetch_timeout<T, F>(timeout: Duration, future: F, service: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(InspectorError::transport(
            service,
            format!("no response within {:?}", timeout),
        )),
    }
}
