//! Agent Executor
//!
//! Bounded tool-calling loop shared by every agent role:
//! ask the model, run the permitted tools it requests, feed the results
//! back, and stop at the first answer without tool calls.

use std::time::Instant;
use tracing::{debug, info};

use super::AgentProfile;
use crate::ai::{ChatMessage, ChatRequest, LlmProvider, MetricsCollector, TaskMetrics, TokenUsage};
use crate::config::LlmConfig;
use crate::tools::ToolBox;
use crate::types::{ErrorCategory, InspectorError, Result};

/// Final answer of one agent run
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub text: String,
    pub usage: TokenUsage,
    pub api_calls: u32,
    pub tool_calls: u32,
}

/// Runs agent profiles against one provider and one tool box
pub struct AgentExecutor<'a> {
    provider: &'a dyn LlmProvider,
    tools: &'a ToolBox,
    metrics: &'a MetricsCollector,
    max_iterations: usize,
    temperature: f32,
    max_tokens: usize,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        tools: &'a ToolBox,
        metrics: &'a MetricsCollector,
        config: &LlmConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            metrics,
            max_iterations: config.max_tool_iterations,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Run `profile` on `prompt` until it produces a final answer.
    ///
    /// `task_name` labels the metrics entry recorded on success.
    pub async fn run(
        &self,
        profile: &AgentProfile,
        task_name: &str,
        prompt: &str,
    ) -> Result<AgentOutcome> {
        let start = Instant::now();
        let definitions = profile.tool_definitions();
        let mut messages = vec![
            ChatMessage::system(profile.system_prompt()),
            ChatMessage::user(prompt),
        ];
        let mut usage = TokenUsage::default();
        let mut api_calls = 0u32;
        let mut tool_calls = 0u32;

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest::new(messages.clone())
                .with_model(&profile.model)
                .with_tools(definitions.clone())
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);

            let response = self.provider.chat(&request).await?;
            self.metrics.record_response(&response);
            usage += response.usage;
            api_calls += 1;

            if response.has_tool_calls() {
                debug!(
                    "[{}] step {}: {} tool call(s)",
                    profile.role_name,
                    iteration,
                    response.tool_calls.len()
                );
                messages.push(ChatMessage::assistant_with_tools(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));
                for call in &response.tool_calls {
                    tool_calls += 1;
                    debug!("[{}] -> {}({})", profile.role_name, call.name, call.arguments);
                    let result = self.tools.invoke(call, profile.tools).await?;
                    messages.push(ChatMessage::tool_response(&call.call_id, result));
                }
                continue;
            }

            let text = response.content.trim();
            if text.is_empty() {
                return Err(InspectorError::llm_with_category(
                    ErrorCategory::ParseError,
                    format!("{} returned an empty answer", profile.role_name),
                ));
            }

            debug!("[{}] final answer after {} step(s)", profile.role_name, iteration);
            let duration_ms = start.elapsed().as_millis() as u64;
            self.metrics.complete_task(TaskMetrics {
                name: task_name.to_string(),
                api_calls,
                tool_calls,
                input_tokens: usage.input_tokens as u64,
                output_tokens: usage.output_tokens as u64,
                duration_ms,
            });
            info!(
                "{} finished {} ({} tokens, {} tool calls)",
                profile.role_name,
                task_name,
                usage.total(),
                tool_calls
            );

            return Ok(AgentOutcome {
                text: text.to_string(),
                usage,
                api_calls,
                tool_calls,
            });
        }

        Err(InspectorError::llm_with_category(
            ErrorCategory::IterationLimit,
            format!(
                "{} did not produce a final answer within {} model calls",
                profile.role_name, self.max_iterations
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRole;
    use crate::ai::{LlmResponse, ToolCall};
    use crate::config::InspectionConfig;
    use crate::testing::{ScriptedProvider, StubMetadata};
    use crate::types::FailureKind;
    use serde_json::json;
    use std::sync::Arc;

    fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            call_id: "call_0".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    fn toolbox() -> ToolBox {
        ToolBox::new(
            Arc::new(StubMetadata::new().with_readme("# Scraper\nScrapes things.")),
            &InspectionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_tool_round_trip_then_answer() {
        let provider = ScriptedProvider::new().script(
            AgentRole::ActorEvaluator,
            vec![
                LlmResponse::with_tool_calls(
                    "",
                    vec![tool_call("get_actor_readme", json!({"actor_name": "owner/pkg"}))],
                ),
                LlmResponse::text("README is clear.\n\nOverall rating: good"),
            ],
        );
        let tools = toolbox();
        let metrics = MetricsCollector::new("run");
        let executor = AgentExecutor::new(&provider, &tools, &metrics, &LlmConfig::default());
        let profile = AgentProfile::for_role(AgentRole::ActorEvaluator, "m");

        let outcome = executor.run(&profile, "documentation", "Inspect owner/pkg").await.unwrap();
        assert_eq!(outcome.text, "README is clear.\n\nOverall rating: good");
        assert_eq!(outcome.api_calls, 2);
        assert_eq!(outcome.tool_calls, 1);

        let requests = provider.requests();
        assert!(requests.iter().all(|r| r.model.as_deref() == Some("m")));
        let second = &requests[1].messages;
        assert_eq!(second.len(), 4);
        assert!(second[3].content.contains("Scrapes things."));
        assert_eq!(metrics.snapshot().tasks[0].name, "documentation");
    }

    #[tokio::test]
    async fn test_unpermitted_tool_is_refused() {
        let provider = ScriptedProvider::new().script(
            AgentRole::LeadInspector,
            vec![
                LlmResponse::with_tool_calls(
                    "",
                    vec![tool_call("get_actor_readme", json!({"actor_name": "owner/pkg"}))],
                ),
                LlmResponse::text("Summary"),
            ],
        );
        let tools = toolbox();
        let metrics = MetricsCollector::new("run");
        let executor = AgentExecutor::new(&provider, &tools, &metrics, &LlmConfig::default());
        let profile = AgentProfile::for_role(AgentRole::LeadInspector, "m");

        executor.run(&profile, "summary", "Summarize").await.unwrap();
        let requests = provider.requests();
        assert!(requests[1].messages[3].content.starts_with("ERROR"));
        assert_eq!(tools.memo_len(), 0);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let looping: Vec<_> = (0..5)
            .map(|_| LlmResponse::with_tool_calls("", vec![tool_call("get_platform_pricing", json!({}))]))
            .collect();
        let provider = ScriptedProvider::new().script(AgentRole::PricingExpert, looping);
        let tools = toolbox();
        let metrics = MetricsCollector::new("run");
        let config = LlmConfig {
            max_tool_iterations: 3,
            ..LlmConfig::default()
        };
        let executor = AgentExecutor::new(&provider, &tools, &metrics, &config);
        let profile = AgentProfile::for_role(AgentRole::PricingExpert, "m");

        let err = executor.run(&profile, "pricing", "Price it").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ModelInvocation);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_answer_fails() {
        let provider = ScriptedProvider::new().script(AgentRole::CodeQuality, vec![LlmResponse::text("  \n")]);
        let tools = toolbox();
        let metrics = MetricsCollector::new("run");
        let executor = AgentExecutor::new(&provider, &tools, &metrics, &LlmConfig::default());
        let profile = AgentProfile::for_role(AgentRole::CodeQuality, "m");

        let err = executor.run(&profile, "code_quality", "Review").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ModelInvocation);
    }
}
