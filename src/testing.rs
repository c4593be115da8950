//! Test doubles for the external collaborators: metadata source, model
//! provider and report/charge sinks.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::agents::AgentRole;
use crate::ai::{ChatRequest, LlmProvider, LlmResponse, TokenUsage};
use crate::publish::{ChargeEvent, ChargeSink, ReportSink};
use crate::report::InspectionReport;
use crate::tools::source::{
    ActorDefinition, ActorRecord, BuildRecord, MetadataSource, PricingEntry, RepositorySnapshot,
    StoreItem, StoreQuery, VersionRecord,
};
use crate::types::{ActorId, ErrorCategory, InspectorError, Result, RunId};

// =============================================================================
// Metadata
// =============================================================================

/// Canned registry answers for one Actor
#[derive(Default)]
pub struct StubMetadata {
    actor: Option<ActorRecord>,
    build: Option<BuildRecord>,
    versions: Vec<VersionRecord>,
    store: Vec<StoreItem>,
    repositories: HashMap<String, RepositorySnapshot>,
    failing: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor: ActorRecord) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_build(mut self, build: BuildRecord) -> Self {
        self.build = Some(build);
        self
    }

    fn definition(&mut self) -> &mut ActorDefinition {
        self.build
            .get_or_insert_with(BuildRecord::default)
            .actor_definition
            .get_or_insert_with(ActorDefinition::default)
    }

    pub fn with_readme(mut self, readme: &str) -> Self {
        self.definition().readme = Some(readme.to_string());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.definition().input = Some(schema);
        self
    }

    pub fn with_pricing(mut self, entries: Vec<PricingEntry>) -> Self {
        self.actor
            .get_or_insert_with(|| ActorRecord {
                name: "pkg".to_string(),
                username: "owner".to_string(),
                ..ActorRecord::default()
            })
            .pricing_infos = entries;
        self
    }

    pub fn with_versions(mut self, versions: Vec<VersionRecord>) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_store(mut self, items: Vec<StoreItem>) -> Self {
        self.store = items;
        self
    }

    pub fn with_repository(mut self, url: &str, snapshot: RepositorySnapshot) -> Self {
        self.repositories.insert(url.to_string(), snapshot);
        self
    }

    /// Every call fails with a transport error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every call stalls for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Counter of source calls, shared with the stub
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    async fn hit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(InspectorError::transport("stub", "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for StubMetadata {
    async fn actor(&self, _id: &ActorId) -> Result<Option<ActorRecord>> {
        self.hit().await?;
        Ok(self.actor.clone())
    }

    async fn default_build(&self, _id: &ActorId) -> Result<Option<BuildRecord>> {
        self.hit().await?;
        Ok(self.build.clone())
    }

    async fn versions(&self, _id: &ActorId) -> Result<Vec<VersionRecord>> {
        self.hit().await?;
        Ok(self.versions.clone())
    }

    async fn search_store(&self, query: &StoreQuery) -> Result<Vec<StoreItem>> {
        self.hit().await?;
        Ok(self
            .store
            .iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn repository(&self, repo_url: &str, _max_tokens: usize) -> Result<Option<RepositorySnapshot>> {
        self.hit().await?;
        Ok(self.repositories.get(repo_url).cloned())
    }
}

// =============================================================================
// Model
// =============================================================================

enum Step {
    Reply(LlmResponse),
    Fail(ErrorCategory),
}

/// Provider replying from per-role scripts.
///
/// The role is recognised from the system prompt. Once a role's script is
/// exhausted it answers `"<role> findings.\n\nOverall rating: good"`.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<AgentRole, VecDeque<Step>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, role: AgentRole, replies: Vec<LlmResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .extend(replies.into_iter().map(Step::Reply));
        self
    }

    /// Single final answer for `role`
    pub fn answer(self, role: AgentRole, text: &str) -> Self {
        let mut reply = LlmResponse::text(text);
        reply.usage = TokenUsage::from_openai(100, 40);
        self.script(role, vec![reply])
    }

    /// Next call for `role` fails
    pub fn fail(self, role: AgentRole, category: ErrorCategory) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(Step::Fail(category));
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn role_of(request: &ChatRequest) -> Option<AgentRole> {
        let system = &request.messages.first()?.content;
        AgentRole::ALL
            .into_iter()
            .find(|role| system.contains(&format!("You are the {}.", role.role_name())))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let Some(role) = Self::role_of(request) else {
            return Err(InspectorError::llm_with_category(
                ErrorCategory::BadRequest,
                "request without a known agent persona",
            ));
        };

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(VecDeque::pop_front);
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(category)) => Err(InspectorError::llm_with_category(
                category,
                format!("scripted failure for {}", role),
            )),
            None => Ok(LlmResponse::text(format!(
                "{} findings.\n\nOverall rating: good",
                role
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "model-A"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// What a [`RecordingSink`] observed, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Charge { event_name: String, count: u32 },
    Persist { run_id: RunId, actor: String },
}

/// In-memory report and charge sink
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    reports: Mutex<Vec<InspectionReport>>,
    fail_persist: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose `persist` always fails
    pub fn failing_persist() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<InspectionReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn charge_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Charge { event_name, .. } => Some(event_name),
                SinkEvent::Persist { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn persist(&self, run_id: &RunId, report: &InspectionReport) -> Result<()> {
        if self.fail_persist {
            return Err(InspectorError::Storage("disk full".to_string()));
        }
        self.events.lock().unwrap().push(SinkEvent::Persist {
            run_id: run_id.clone(),
            actor: report.actor.to_string(),
        });
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl ChargeSink for RecordingSink {
    async fn charge(&self, event: &ChargeEvent) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::Charge {
            event_name: event.event_name.clone(),
            count: event.count,
        });
        Ok(())
    }
}
