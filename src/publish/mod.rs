//! Report Publishing and Billing
//!
//! Sinks for the finished report and for billing events. The local SQLite
//! implementations live in `storage`; the platform ones in [`platform`].

pub mod platform;

pub use platform::{PlatformChargeSink, PlatformReportSink};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::constants::billing;
use crate::report::InspectionReport;
use crate::tasks::Rating;
use crate::types::{Result, RunId};

// =============================================================================
// Records
// =============================================================================

/// Dataset record pushed once per successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub actor_id: String,
    /// Rendered markdown report
    pub response: String,
    pub overall_rating: Rating,
    pub model: String,
    pub total_tokens: u64,
    /// Hex SHA-256 of `response`
    pub digest: String,
}

impl ReportRecord {
    pub fn from_report(report: &InspectionReport) -> Self {
        Self {
            actor_id: report.actor.to_string(),
            response: report.markdown.clone(),
            overall_rating: report.overall,
            model: report.model.clone(),
            total_tokens: report.usage.total() as u64,
            digest: content_digest(&report.markdown),
        }
    }
}

pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One billing event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeEvent {
    pub run_id: RunId,
    pub event_name: String,
    pub count: u32,
    /// Price of one unit
    pub price_usd: f64,
}

impl ChargeEvent {
    /// Run-start charge: one unit per started GB of memory, at least one
    pub fn run_start(run_id: RunId, memory_mbytes: u64, price_usd: f64) -> Self {
        let count = memory_mbytes.div_ceil(1024).max(1);
        Self {
            run_id,
            event_name: billing::RUN_START_EVENT.to_string(),
            count: u32::try_from(count).unwrap_or(u32::MAX),
            price_usd,
        }
    }

    pub fn task_completed(run_id: RunId, price_usd: f64) -> Self {
        Self {
            run_id,
            event_name: billing::TASK_COMPLETED_EVENT.to_string(),
            count: 1,
            price_usd,
        }
    }

    pub fn total_usd(&self) -> f64 {
        self.price_usd * self.count as f64
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Destination of finished reports; called at most once per run
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, run_id: &RunId, report: &InspectionReport) -> Result<()>;
}

/// Destination of billing events
#[async_trait]
pub trait ChargeSink: Send + Sync {
    async fn charge(&self, event: &ChargeEvent) -> Result<()>;
}

pub type SharedReportSink = Arc<dyn ReportSink>;
pub type SharedChargeSink = Arc<dyn ChargeSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_start_count_rounds_up() {
        let run = RunId::new("r");
        assert_eq!(ChargeEvent::run_start(run.clone(), 1024, 0.005).count, 1);
        assert_eq!(ChargeEvent::run_start(run.clone(), 1025, 0.005).count, 2);
        assert_eq!(ChargeEvent::run_start(run.clone(), 1536, 0.005).count, 2);
        assert_eq!(ChargeEvent::run_start(run.clone(), 4096, 0.005).count, 4);
        assert_eq!(ChargeEvent::run_start(run.clone(), 256, 0.005).count, 1);
        assert_eq!(ChargeEvent::run_start(run, 0, 0.005).count, 1);
    }

    #[test]
    fn test_charge_event_names() {
        let start = ChargeEvent::run_start(RunId::new("r"), 2048, 0.005);
        assert_eq!(start.event_name, "actor-start-gb");
        assert!((start.total_usd() - 0.01).abs() < 1e-9);

        let done = ChargeEvent::task_completed(RunId::new("r"), 0.1);
        assert_eq!(done.event_name, "task-completed");
        assert_eq!(done.count, 1);
    }

    #[test]
    fn test_content_digest() {
        assert_eq!(
            content_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_digest("a"), content_digest("a"));
        assert_ne!(content_digest("a"), content_digest("b"));
    }
}
