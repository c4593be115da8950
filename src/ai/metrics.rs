//! Run Metrics Collection
//!
//! Aggregates model usage and latency for one inspection run, with a
//! per-task breakdown. Thread-safe so concurrent pre-fetches and the agent
//! loop can share one collector.

use crate::ai::provider::LlmResponse;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector for one inspection run.
///
/// Uses atomic operations for counters and RwLock for the task breakdown.
pub struct MetricsCollector {
    /// Run identifier
    run_id: String,
    /// Run start time
    start_time: Instant,
    /// Total model API calls
    api_calls: AtomicU32,
    /// Total tool invocations requested by agents
    tool_calls: AtomicU32,
    /// Total input tokens
    input_tokens: AtomicU64,
    /// Total output tokens
    output_tokens: AtomicU64,
    /// Total latency in milliseconds
    total_latency_ms: AtomicU64,
    /// Per-task metrics, in completion order
    task_metrics: RwLock<Vec<TaskMetrics>>,
}

/// Metrics for one agent task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskMetrics {
    pub name: String,
    pub api_calls: u32,
    pub tool_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// Summary statistics for a run
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub tool_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub tasks: Vec<TaskMetrics>,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            tool_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            task_metrics: RwLock::new(Vec::new()),
        }
    }

    /// Record metrics from a model response
    pub fn record_response(&self, response: &LlmResponse) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.tool_calls
            .fetch_add(response.tool_calls.len() as u32, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(response.usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(response.usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(response.timing.total_ms, Ordering::Relaxed);
    }

    /// Record a finished task
    pub fn complete_task(&self, task_metrics: TaskMetrics) {
        let mut tasks = self.task_metrics.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics task_metrics RwLock poisoned, recovering");
            poisoned.into_inner()
        });
        tasks.push(task_metrics);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        let tasks = self
            .task_metrics
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics task_metrics RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        MetricsSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
            tasks,
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             API Calls: {} (tool calls: {})\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.tool_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseTiming, TokenUsage, ToolCall};

    fn response(input: u32, output: u32, ms: u64, tools: usize) -> LlmResponse {
        LlmResponse {
            tool_calls: (0..tools)
                .map(|i| ToolCall {
                    call_id: format!("call_{i}"),
                    name: "get_platform_pricing".to_string(),
                    arguments: serde_json::json!({}),
                })
                .collect(),
            usage: TokenUsage::from_openai(input, output),
            timing: ResponseTiming { total_ms: ms },
            ..LlmResponse::default()
        }
    }

    #[test]
    fn test_record_response() {
        let metrics = MetricsCollector::new("run-1");
        metrics.record_response(&response(100, 50, 500, 2));
        metrics.record_response(&response(200, 10, 300, 0));

        let summary = metrics.snapshot();
        assert_eq!(summary.api_calls, 2);
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(summary.total_tokens, 360);
        assert!((summary.avg_latency_ms - 400.0).abs() < 0.01);
    }

    #[test]
    fn test_task_breakdown_keeps_order() {
        let metrics = MetricsCollector::new("run-2");
        for name in ["code_quality", "documentation"] {
            metrics.complete_task(TaskMetrics {
                name: name.to_string(),
                api_calls: 1,
                tool_calls: 0,
                input_tokens: 1,
                output_tokens: 1,
                duration_ms: 1,
            });
        }
        let names: Vec<_> = metrics
            .snapshot()
            .tasks
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["code_quality", "documentation"]);
    }

    #[test]
    fn test_display_mentions_run() {
        let summary = MetricsCollector::new("run-3").snapshot();
        assert!(summary.display().contains("run-3"));
        assert_eq!(summary.avg_latency_ms, 0.0);
    }
}
