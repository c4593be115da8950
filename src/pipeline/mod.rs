//! Inspection Pipeline
//!
//! Runs one inspection as a fold over [`TASKS`]: every task sees the
//! sections produced before it, and the lead inspector summarizes them all.
//!
//! ```text
//! validate ─▶ run-start charge ─▶ code quality ─▶ documentation ─▶ uniqueness
//!          ─▶ pricing ─▶ summary ─▶ assemble ─▶ persist ─▶ task-completed charge
//! ```
//!
//! Any error after the run-start charge aborts the run: nothing is
//! persisted and no task-completed charge is emitted.

mod request;

pub use request::InspectionRequest;

use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};

use crate::agents::{AgentExecutor, AgentProfile, AgentRole};
use crate::ai::{MetricsCollector, MetricsSummary, SharedProvider, TimeoutConfig, with_timeout};
use crate::config::Config;
use crate::publish::{ChargeEvent, SharedChargeSink, SharedReportSink};
use crate::report::{InspectionReport, TaskResult};
use crate::tasks::{Rating, TASKS, TaskSpec, summary_prompt};
use crate::tools::{SharedSource, ToolBox};
use crate::types::{Result, RunId};

/// Successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub report: InspectionReport,
    pub metrics: MetricsSummary,
}

/// Collaborators shared by every run
pub struct InspectionPipeline {
    config: Config,
    provider: SharedProvider,
    source: SharedSource,
    reports: SharedReportSink,
    charges: SharedChargeSink,
}

impl InspectionPipeline {
    pub fn new(
        config: Config,
        provider: SharedProvider,
        source: SharedSource,
        reports: SharedReportSink,
        charges: SharedChargeSink,
    ) -> Self {
        Self {
            config,
            provider,
            source,
            reports,
            charges,
        }
    }

    /// Run one inspection end to end
    pub async fn run(&self, run_id: RunId, request: &InspectionRequest) -> Result<RunOutcome> {
        request.validate(&self.config)?;
        info!(
            "Inspecting {} with {} (pedantic: {}, run: {})",
            request.actor, request.model, request.pedantic, run_id
        );

        let billing = &self.config.billing;
        self.charges
            .charge(&ChargeEvent::run_start(
                run_id.clone(),
                billing.memory_mbytes,
                billing.run_start_price_usd,
            ))
            .await?;

        let timeouts = TimeoutConfig::from_config(&self.config);
        let tools = ToolBox::new(self.source.clone(), &self.config.inspection)
            .with_fetch_timeout(timeouts.metadata_request);
        let metrics = MetricsCollector::new(run_id.as_str());
        let executor = AgentExecutor::new(self.provider.as_ref(), &tools, &metrics, &self.config.llm);

        let mut results: Vec<TaskResult> = Vec::with_capacity(TASKS.len());
        for spec in &TASKS {
            let result = self
                .run_task(&executor, &tools, &timeouts, spec, request, &results)
                .await?;
            info!("{}: {}", spec.category.title(), result.rating);
            results.push(result);
        }

        let lead = AgentProfile::for_role(AgentRole::LeadInspector, &request.model);
        let prompt = summary_prompt(&request.actor, request.pedantic, &results);
        if request.debug {
            debug!("Summary prompt:\n{}", prompt);
        }
        let summary = with_timeout(
            timeouts.agent_task,
            executor.run(&lead, "summary", &prompt),
            "summary task",
        )
        .await?;

        let report = InspectionReport::assemble(
            request.actor.clone(),
            request.model.clone(),
            results,
            summary.text,
            summary.usage,
        );
        info!(
            "Overall rating for {}: {} ({} tokens)",
            report.actor,
            report.overall,
            report.usage.total()
        );

        self.reports.persist(&run_id, &report).await?;
        self.charges
            .charge(&ChargeEvent::task_completed(
                run_id.clone(),
                billing.task_completed_price_usd,
            ))
            .await?;

        Ok(RunOutcome {
            run_id,
            report,
            metrics: metrics.snapshot(),
        })
    }

    #[instrument(skip_all, fields(task = spec.name(), actor = %request.actor))]
    async fn run_task(
        &self,
        executor: &AgentExecutor<'_>,
        tools: &ToolBox,
        timeouts: &TimeoutConfig,
        spec: &TaskSpec,
        request: &InspectionRequest,
        prior: &[TaskResult],
    ) -> Result<TaskResult> {
        let profile = AgentProfile::for_role(spec.role, &request.model);
        let inputs = spec.prefetch_inputs(&request.actor, tools.code_context_max_tokens());
        let artifacts = try_join_all(inputs.iter().map(|input| tools.fetch(input))).await?;

        let gaps: Vec<String> = artifacts.iter().filter_map(|a| a.gap()).collect();
        let primary_missing = artifacts
            .iter()
            .any(|a| a.kind == spec.primary.artifact_kind() && !a.is_available());

        let prompt = spec.prompt(&request.actor, request.pedantic, &artifacts, prior);
        if request.debug {
            debug!("Prompt for {}:\n{}", spec.name(), prompt);
        }

        // Prefetch expiry is a transport failure; only the agent loop is a model timeout
        let outcome = with_timeout(
            timeouts.agent_task,
            executor.run(&profile, spec.name(), &prompt),
            &format!("{} task", spec.name()),
        )
        .await?;
        let rating = if primary_missing {
            warn!(
                "{} rated unknown: {} unavailable",
                spec.category.title(),
                spec.primary.artifact_kind()
            );
            Rating::Unknown
        } else {
            Rating::extract(&outcome.text)
        };

        Ok(TaskResult {
            category: spec.category,
            text: outcome.text,
            rating,
            gaps,
            usage: outcome.usage,
        })
    }
}
