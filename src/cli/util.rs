//! CLI Common Utilities
//!
//! Shared setup for command handlers: the report database and the
//! environment overrides the platform injects into a run.

use tracing::debug;

use crate::config::Config;
use crate::constants::platform;
use crate::storage::Database;
use crate::types::{InspectorError, Result, RunId};

/// Open (creating if needed) and initialize the report database
pub fn open_database(config: &Config) -> Result<Database> {
    let path = &config.storage.database_path;
    debug!("Opening report database at {}", path.display());
    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

/// Open the report database, failing when no run has created it yet
pub fn require_database(config: &Config) -> Result<Database> {
    let path = &config.storage.database_path;
    if !path.exists() {
        return Err(InspectorError::Config(format!(
            "No report database at {}. Run 'actor-inspector inspect' first.",
            path.display()
        )));
    }
    open_database(config)
}

/// Parse an `ACTOR_MEMORY_MBYTES` value
pub fn parse_memory_mbytes(value: Option<&str>) -> Result<Option<u64>> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u64>().map(Some).map_err(|_| {
        InspectorError::Config(format!(
            "{} must be a whole number of megabytes, got '{}'",
            platform::MEMORY_MBYTES_ENV,
            raw
        ))
    })
}

/// Apply the run memory the platform reports, if any
pub fn apply_platform_env(config: &mut Config) -> Result<()> {
    let value = std::env::var(platform::MEMORY_MBYTES_ENV).ok();
    if let Some(mbytes) = parse_memory_mbytes(value.as_deref())? {
        config.billing.memory_mbytes = mbytes;
    }
    Ok(())
}

/// Run ID from `ACTOR_RUN_ID`, or a fresh one for local runs
pub fn local_run_id() -> RunId {
    std::env::var(platform::RUN_ID_ENV)
        .ok()
        .filter(|id| !id.trim().is_empty())
        .map(RunId::new)
        .unwrap_or_else(RunId::generate)
}
