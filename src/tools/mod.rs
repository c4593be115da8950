//! Fetch Tools
//!
//! Stateless wrappers around registry calls, exposed to the agents as
//! function tools and used directly for task pre-fetches.
//!
//! ## Outcomes
//!
//! - `Ok(artifact)` with `Available` content: the metadata exists
//! - `Ok(artifact)` with `Unavailable` content: the resource is missing, a gap
//! - `Err(_)`: hard failure (transport, auth), aborts the run
//!
//! Every artifact fetched during a run is memoized in its [`ToolBox`].

pub mod apify;
pub mod artifact;
pub mod code;
pub mod pricing;
pub mod source;

pub use apify::ApifyClient;
pub use artifact::{ArtifactContent, ArtifactKind, FetchedArtifact};
pub use source::{MetadataSource, SharedSource, StoreQuery};

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::ai::{ToolCall, ToolDefinition, with_fetch_timeout};
use crate::config::InspectionConfig;
use crate::constants::network::METADATA_TIMEOUT_SECS;
use crate::constants::tools::SEARCH_MAX_LIMIT;
use crate::types::{ActorId, Result};

// =============================================================================
// Tool Kinds
// =============================================================================

/// Every tool an agent can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ActorReadme,
    ActorInputSchema,
    CodeContext,
    SearchRelatedActors,
    ActorPricing,
    PlatformPricing,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ActorReadme,
        ToolKind::ActorInputSchema,
        ToolKind::CodeContext,
        ToolKind::SearchRelatedActors,
        ToolKind::ActorPricing,
        ToolKind::PlatformPricing,
    ];

    /// Name exposed to the model
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ActorReadme => "get_actor_readme",
            ToolKind::ActorInputSchema => "get_actor_input_schema",
            ToolKind::CodeContext => "get_code_context",
            ToolKind::SearchRelatedActors => "search_related_actors",
            ToolKind::ActorPricing => "get_actor_pricing_information",
            ToolKind::PlatformPricing => "get_platform_pricing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            ToolKind::ActorReadme => ArtifactKind::Readme,
            ToolKind::ActorInputSchema => ArtifactKind::InputSchema,
            ToolKind::CodeContext => ArtifactKind::SourceCode,
            ToolKind::SearchRelatedActors => ArtifactKind::RelatedActors,
            ToolKind::ActorPricing => ArtifactKind::PricingInfo,
            ToolKind::PlatformPricing => ArtifactKind::PlatformPricing,
        }
    }

    /// Function-tool definition offered to the model
    pub fn definition(self) -> ToolDefinition {
        let actor_name = json!({
            "type": "string",
            "description": "Actor identifier in the form owner/name"
        });

        let (description, parameters) = match self {
            ToolKind::ActorReadme => (
                "Fetch the README of the specified Apify Actor.",
                json!({
                    "type": "object",
                    "properties": {"actor_name": actor_name},
                    "required": ["actor_name"]
                }),
            ),
            ToolKind::ActorInputSchema => (
                "Fetch the input schema of the specified Apify Actor: title, description \
                 and every input property with its default or prefill value.",
                json!({
                    "type": "object",
                    "properties": {"actor_name": actor_name},
                    "required": ["actor_name"]
                }),
            ),
            ToolKind::CodeContext => (
                "Fetch the source code of the specified Apify Actor as a file tree plus \
                 file contents.",
                json!({
                    "type": "object",
                    "properties": {
                        "actor_name": actor_name,
                        "max_tokens": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Maximum number of tokens to retrieve"
                        }
                    },
                    "required": ["actor_name"]
                }),
            ),
            ToolKind::SearchRelatedActors => (
                "Discover Actors in the Apify Store by full-text search over title, name, \
                 description, username and README. Returns name, description, run \
                 statistics, pricing and URL. Search with only a few keywords.",
                json!({
                    "type": "object",
                    "properties": {
                        "search": {"type": "string", "description": "Keywords to search by"},
                        "limit": {"type": "integer", "minimum": 1, "maximum": SEARCH_MAX_LIMIT},
                        "offset": {"type": "integer", "minimum": 0}
                    },
                    "required": ["search"]
                }),
            ),
            ToolKind::ActorPricing => (
                "Fetch the pricing model currently in effect for the specified Apify Actor.",
                json!({
                    "type": "object",
                    "properties": {"actor_name": actor_name},
                    "required": ["actor_name"]
                }),
            ),
            ToolKind::PlatformPricing => (
                "Get the Apify platform subscription plans used for pay-per-platform-usage \
                 pricing.",
                json!({"type": "object", "properties": {}}),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Tool Input
// =============================================================================

/// Validated tool arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInput {
    Readme(ActorId),
    InputSchema(ActorId),
    CodeContext { actor: ActorId, max_tokens: usize },
    Search(StoreQuery),
    Pricing(ActorId),
    PlatformPricing,
}

impl ToolInput {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInput::Readme(_) => ToolKind::ActorReadme,
            ToolInput::InputSchema(_) => ToolKind::ActorInputSchema,
            ToolInput::CodeContext { .. } => ToolKind::CodeContext,
            ToolInput::Search(_) => ToolKind::SearchRelatedActors,
            ToolInput::Pricing(_) => ToolKind::ActorPricing,
            ToolInput::PlatformPricing => ToolKind::PlatformPricing,
        }
    }

    fn memo_key(&self) -> String {
        match self {
            ToolInput::Readme(id) | ToolInput::InputSchema(id) | ToolInput::Pricing(id) => {
                format!("{}:{}", self.kind(), id)
            }
            ToolInput::CodeContext { actor, max_tokens } => {
                format!("{}:{}:{}", self.kind(), actor, max_tokens)
            }
            ToolInput::Search(q) => {
                format!("{}:{}:{}:{}", self.kind(), q.search, q.limit, q.offset)
            }
            ToolInput::PlatformPricing => self.kind().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ActorArgs {
    actor_name: String,
}

#[derive(Deserialize)]
struct CodeArgs {
    actor_name: String,
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct SearchArgs {
    search: String,
    limit: Option<u32>,
    offset: Option<u32>,
}

fn args<T: serde::de::DeserializeOwned>(value: &Value) -> std::result::Result<T, String> {
    if let Value::String(raw) = value {
        return Err(format!("arguments are not valid JSON: {}", raw));
    }
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid arguments: {}", e))
}

fn actor(raw: &str) -> std::result::Result<ActorId, String> {
    ActorId::parse(raw).map_err(|e| e.to_string())
}

// =============================================================================
// Tool Box
// =============================================================================

/// Per-run tool executor with an artifact memo
pub struct ToolBox {
    source: SharedSource,
    code_context_max_tokens: usize,
    search_limit: u32,
    fetch_timeout: Duration,
    memo: DashMap<String, FetchedArtifact>,
}

impl ToolBox {
    pub fn new(source: SharedSource, config: &InspectionConfig) -> Self {
        Self {
            source,
            code_context_max_tokens: config.code_context_max_tokens,
            search_limit: config.search_limit,
            fetch_timeout: Duration::from_secs(METADATA_TIMEOUT_SECS),
            memo: DashMap::new(),
        }
    }

    /// Bound every uncached fetch; expiry is a transport failure
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn code_context_max_tokens(&self) -> usize {
        self.code_context_max_tokens
    }

    /// Number of distinct artifacts fetched so far
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Validate model-produced arguments for `kind`
    pub fn parse_input(&self, kind: ToolKind, value: &Value) -> std::result::Result<ToolInput, String> {
        match kind {
            ToolKind::ActorReadme => Ok(ToolInput::Readme(actor(&args::<ActorArgs>(value)?.actor_name)?)),
            ToolKind::ActorInputSchema => Ok(ToolInput::InputSchema(actor(
                &args::<ActorArgs>(value)?.actor_name,
            )?)),
            ToolKind::ActorPricing => Ok(ToolInput::Pricing(actor(&args::<ActorArgs>(value)?.actor_name)?)),
            ToolKind::CodeContext => {
                let parsed: CodeArgs = args(value)?;
                let max_tokens = parsed.max_tokens.unwrap_or(self.code_context_max_tokens);
                if max_tokens == 0 {
                    return Err("max_tokens must be at least 1".to_string());
                }
                Ok(ToolInput::CodeContext {
                    actor: actor(&parsed.actor_name)?,
                    max_tokens,
                })
            }
            ToolKind::SearchRelatedActors => {
                let parsed: SearchArgs = args(value)?;
                let limit = parsed.limit.unwrap_or(self.search_limit);
                if !(1..=SEARCH_MAX_LIMIT).contains(&limit) {
                    return Err(format!("limit must be between 1 and {}", SEARCH_MAX_LIMIT));
                }
                if parsed.search.trim().is_empty() {
                    return Err("search must not be empty".to_string());
                }
                Ok(ToolInput::Search(StoreQuery {
                    search: parsed.search,
                    limit,
                    offset: parsed.offset.unwrap_or(0),
                }))
            }
            ToolKind::PlatformPricing => Ok(ToolInput::PlatformPricing),
        }
    }

    /// Fetch one artifact, consulting the run memo first
    pub async fn fetch(&self, input: &ToolInput) -> Result<FetchedArtifact> {
        let key = input.memo_key();
        let cached = self.memo.get(&key).map(|entry| entry.value().clone());
        if let Some(artifact) = cached {
            debug!("Memo hit: {}", key);
            return Ok(artifact);
        }

        let artifact =
            with_fetch_timeout(self.fetch_timeout, self.fetch_uncached(input), &key).await?;
        if let Some(gap) = artifact.gap() {
            warn!("{}", gap);
        }
        self.memo.insert(key, artifact.clone());
        Ok(artifact)
    }

    /// Execute a model tool call and return the tool message content.
    ///
    /// Refusals and argument errors are returned as text for the model;
    /// only hard fetch failures are `Err`.
    pub async fn invoke(&self, call: &ToolCall, permitted: &[ToolKind]) -> Result<String> {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            return Ok(format!("ERROR: unknown tool '{}'", call.name));
        };
        if !permitted.contains(&kind) {
            warn!("Refused tool call outside permitted set: {}", kind);
            return Ok(format!(
                "ERROR: tool '{}' is not available to you. Use only the tools you were given.",
                kind
            ));
        }

        match self.parse_input(kind, &call.arguments) {
            Ok(input) => Ok(self.fetch(&input).await?.render()),
            Err(message) => {
                debug!("Invalid arguments for {}: {}", kind, message);
                Ok(format!("ERROR: {}: {}", kind, message))
            }
        }
    }

    async fn fetch_uncached(&self, input: &ToolInput) -> Result<FetchedArtifact> {
        match input {
            ToolInput::Readme(id) => self.readme(id).await,
            ToolInput::InputSchema(id) => self.input_schema(id).await,
            ToolInput::CodeContext { actor, max_tokens } => {
                code::fetch_code_context(self.source.as_ref(), actor, *max_tokens).await
            }
            ToolInput::Search(query) => self.search(query).await,
            ToolInput::Pricing(id) => self.pricing(id).await,
            ToolInput::PlatformPricing => Ok(FetchedArtifact::available(
                ArtifactKind::PlatformPricing,
                "apify-platform",
                serde_json::to_string_pretty(&pricing::platform_plans())?,
            )),
        }
    }

    async fn readme(&self, id: &ActorId) -> Result<FetchedArtifact> {
        let kind = ArtifactKind::Readme;
        let Some(build) = self.source.default_build(id).await? else {
            return Ok(FetchedArtifact::unavailable(kind, id.as_str(), "Actor or default build not found"));
        };

        match build.actor_definition.and_then(|d| d.readme) {
            Some(readme) if !readme.trim().is_empty() => {
                Ok(FetchedArtifact::available(kind, id.as_str(), readme))
            }
            _ => Ok(FetchedArtifact::unavailable(kind, id.as_str(), "the default build has no README")),
        }
    }

    async fn input_schema(&self, id: &ActorId) -> Result<FetchedArtifact> {
        let kind = ArtifactKind::InputSchema;
        let Some(build) = self.source.default_build(id).await? else {
            return Ok(FetchedArtifact::unavailable(kind, id.as_str(), "Actor or default build not found"));
        };
        let Some(definition) = build.actor_definition else {
            return Ok(FetchedArtifact::unavailable(kind, id.as_str(), "the default build has no Actor definition"));
        };
        let Some(input) = definition.input else {
            return Ok(FetchedArtifact::unavailable(kind, id.as_str(), "the Actor has no input schema"));
        };

        let flattened = json!({
            "title": definition.title,
            "description": definition.description,
            "properties": flatten_properties(&input),
        });
        Ok(FetchedArtifact::available(
            kind,
            id.as_str(),
            serde_json::to_string_pretty(&flattened)?,
        ))
    }

    async fn search(&self, query: &StoreQuery) -> Result<FetchedArtifact> {
        let items = self.source.search_store(query).await?;
        debug!("Found {} Actors related to '{}'", items.len(), query.search);
        Ok(FetchedArtifact::available(
            ArtifactKind::RelatedActors,
            format!("store?search={}", query.search),
            serde_json::to_string_pretty(&items)?,
        ))
    }

    async fn pricing(&self, id: &ActorId) -> Result<FetchedArtifact> {
        let kind = ArtifactKind::PricingInfo;
        let Some(record) = self.source.actor(id).await? else {
            return Ok(FetchedArtifact::unavailable(kind, id.as_str(), "Actor not found"));
        };

        let text = match pricing::current_pricing(&record.pricing_infos, chrono::Utc::now()) {
            Some(entry) => serde_json::to_string_pretty(entry)?,
            None => serde_json::to_string_pretty(&json!({
                "pricingModel": pricing::PLATFORM_USAGE_MODEL
            }))?,
        };
        Ok(FetchedArtifact::available(kind, id.as_str(), text))
    }
}

/// Reduce input schema properties to title/description/type/default,
/// where the default is the prefill value when one exists
fn flatten_properties(input: &Value) -> Value {
    let Some(properties) = input.get("properties").and_then(Value::as_object) else {
        return json!({});
    };

    let flattened = properties
        .iter()
        .map(|(name, prop)| {
            let default = prop
                .get("prefill")
                .or_else(|| prop.get("default"))
                .cloned()
                .unwrap_or(Value::Null);
            (
                name.clone(),
                json!({
                    "title": prop.get("title"),
                    "description": prop.get("description"),
                    "type": prop.get("type"),
                    "default": default,
                }),
            )
        })
        .collect::<serde_json::Map<_, _>>();
    Value::Object(flattened)
}
