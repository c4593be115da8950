//! Platform Sinks
//!
//! Report and charge sinks backed by the platform API: the run's default
//! dataset and the pay-per-event charge endpoint.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{ChargeEvent, ChargeSink, ReportRecord, ReportSink};
use crate::constants::platform;
use crate::report::InspectionReport;
use crate::tools::ApifyClient;
use crate::types::{InspectorError, Result, RunId};

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| InspectorError::Config(format!("{} environment variable is not set", name)))
}

/// Pushes report records into a dataset
#[derive(Debug)]
pub struct PlatformReportSink {
    client: Arc<ApifyClient>,
    dataset_id: String,
}

impl PlatformReportSink {
    pub fn new(client: Arc<ApifyClient>, dataset_id: impl Into<String>) -> Self {
        Self {
            client,
            dataset_id: dataset_id.into(),
        }
    }

    /// Sink for the run's default dataset (`ACTOR_DEFAULT_DATASET_ID`)
    pub fn from_env(client: Arc<ApifyClient>) -> Result<Self> {
        Ok(Self::new(client, required_env(platform::DATASET_ID_ENV)?))
    }
}

#[async_trait]
impl ReportSink for PlatformReportSink {
    async fn persist(&self, run_id: &RunId, report: &InspectionReport) -> Result<()> {
        let record = ReportRecord::from_report(report);
        self.client
            .post_json(
                &format!("/datasets/{}/items", self.dataset_id),
                &serde_json::to_value(&record)?,
            )
            .await?;
        info!("Pushed report for {} to dataset {} (run {})", report.actor, self.dataset_id, run_id);
        Ok(())
    }
}

/// Emits pay-per-event charges for the current platform run
#[derive(Debug)]
pub struct PlatformChargeSink {
    client: Arc<ApifyClient>,
}

impl PlatformChargeSink {
    pub fn new(client: Arc<ApifyClient>) -> Self {
        Self { client }
    }

    /// Platform run ID of this process (`ACTOR_RUN_ID`)
    pub fn run_id_from_env() -> Result<RunId> {
        required_env(platform::RUN_ID_ENV).map(RunId::new)
    }
}

#[async_trait]
impl ChargeSink for PlatformChargeSink {
    async fn charge(&self, event: &ChargeEvent) -> Result<()> {
        self.client
            .post_json(
                &format!("/actor-runs/{}/charge", event.run_id),
                &json!({"eventName": event.event_name, "count": event.count}),
            )
            .await?;
        info!("Charged {} x{}", event.event_name, event.count);
        Ok(())
    }
}
