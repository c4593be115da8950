//! Metadata Source
//!
//! The narrow seam between fetch tools and the Actor registry. Records only
//! carry the fields the tools read; everything else in the registry payload
//! is ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{ActorId, Result};

// =============================================================================
// Registry Records
// =============================================================================

/// Actor object (`/v2/acts/{id}`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActorRecord {
    pub id: String,
    pub name: String,
    pub username: String,
    pub title: Option<String>,
    pub pricing_infos: Vec<PricingEntry>,
}

/// One entry of an Actor's pricing history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingEntry {
    pub pricing_model: String,
    pub started_at: DateTime<Utc>,
    /// Model-specific terms (price per unit, trial minutes, events, ...)
    #[serde(flatten)]
    pub terms: BTreeMap<String, Value>,
}

/// Default build of an Actor (`/v2/acts/{id}/builds/default`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildRecord {
    pub actor_definition: Option<ActorDefinition>,
    pub act_version: Option<BuildVersion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActorDefinition {
    pub title: Option<String>,
    pub description: Option<String>,
    pub readme: Option<String>,
    /// Raw input schema document
    pub input: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildVersion {
    pub git_repo_url: Option<String>,
}

/// Actor version (`/v2/acts/{id}/versions`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionRecord {
    pub version_number: Option<String>,
    pub build_tag: Option<String>,
    pub git_repo_url: Option<String>,
    pub source_files: Vec<SourceFile>,
}

/// Source file stored with a version
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceFile {
    pub name: String,
    pub format: Option<String>,
    pub content: Option<String>,
}

/// Store search result item (`/v2/store`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreItem {
    pub name: String,
    pub username: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub stats: Option<Value>,
    pub current_pricing_info: Option<Value>,
    pub url: Option<String>,
}

/// Store search parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreQuery {
    pub search: String,
    pub limit: u32,
    pub offset: u32,
}

/// Repository rendered by the repository gateway
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositorySnapshot {
    pub tree: Value,
    pub files: BTreeMap<String, RepositoryFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryFile {
    #[serde(rename = "type")]
    pub file_type: String,
    pub content: Option<String>,
}

// =============================================================================
// Metadata Source Trait
// =============================================================================

/// Read-only access to Actor metadata.
///
/// `Ok(None)` means the resource does not exist. `Err` is reserved for hard
/// failures (network, auth, malformed payloads) that abort the run.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn actor(&self, id: &ActorId) -> Result<Option<ActorRecord>>;

    async fn default_build(&self, id: &ActorId) -> Result<Option<BuildRecord>>;

    async fn versions(&self, id: &ActorId) -> Result<Vec<VersionRecord>>;

    async fn search_store(&self, query: &StoreQuery) -> Result<Vec<StoreItem>>;

    /// Fetch a Git repository through the repository gateway, `None` when
    /// the repository does not exist
    async fn repository(&self, repo_url: &str, max_tokens: usize)
    -> Result<Option<RepositorySnapshot>>;
}

pub type SharedSource = Arc<dyn MetadataSource>;
