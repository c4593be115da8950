//! Inspect Command
//!
//! Run one inspection and print the markdown report.
//!
//! Usage:
//!   actor-inspector inspect owner/name [--model gpt-4o] [--no-pedantic] [--debug]
//!   actor-inspector inspect --input input.json [--output report.md]

use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::ai::{ProviderConfig, create_provider};
use crate::cli::ui::Output;
use crate::cli::ui::output::styled_rating;
use crate::cli::util::{apply_platform_env, local_run_id, open_database};
use crate::config::{Config, ConfigLoader, SinkKind};
use crate::constants::platform;
use crate::pipeline::{InspectionPipeline, InspectionRequest};
use crate::publish::{
    PlatformChargeSink, PlatformReportSink, SharedChargeSink, SharedReportSink,
};
use crate::storage::SharedDatabase;
use crate::tools::{ApifyClient, SharedSource};
use crate::types::{Result, RunId};

/// Flags of `inspect`; each one overrides the input file
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub actor: Option<String>,
    pub model: Option<String>,
    pub pedantic: Option<bool>,
    pub debug: bool,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub report_sink: Option<SinkKind>,
    pub charge_sink: Option<SinkKind>,
    pub quiet: bool,
}

/// Merge the input document with command-line flags.
///
/// The document is the `--input` file when given, else `platform_record`.
pub fn build_input(options: &InspectOptions, platform_record: Option<Value>) -> Result<Value> {
    let mut input = match (&options.input, platform_record) {
        (Some(path), _) => InspectionRequest::load_input(path)?,
        (None, Some(record)) => record,
        (None, None) => Value::Object(Map::new()),
    };
    if !input.is_object() {
        input = Value::Object(Map::new());
    }

    if let Some(fields) = input.as_object_mut() {
        if let Some(actor) = &options.actor {
            fields.insert("actorName".to_string(), Value::from(actor.as_str()));
        }
        if let Some(model) = &options.model {
            fields.insert("modelName".to_string(), Value::from(model.as_str()));
        }
        if let Some(pedantic) = options.pedantic {
            fields.insert("pedantic".to_string(), Value::from(pedantic));
        }
        if options.debug {
            fields.insert("debug".to_string(), Value::from(true));
        }
    }
    Ok(input)
}

/// Input record of a platform run, when the platform names a store
async fn platform_input(client: &ApifyClient) -> Result<Option<Value>> {
    let Some(store_id) = env_value(platform::KEY_VALUE_STORE_ID_ENV) else {
        return Ok(None);
    };
    let key =
        env_value(platform::INPUT_KEY_ENV).unwrap_or_else(|| platform::DEFAULT_INPUT_KEY.to_string());
    debug!("Reading input record {} from store {}", key, store_id);
    client.get_record(&store_id, &key).await
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn select_sinks(
    config: &Config,
    client: &Arc<ApifyClient>,
) -> Result<(SharedReportSink, SharedChargeSink)> {
    let storage = &config.storage;
    let database: Option<SharedDatabase> =
        if storage.report_sink == SinkKind::Local || storage.charge_sink == SinkKind::Local {
            Some(Arc::new(open_database(config)?))
        } else {
            None
        };

    let reports: SharedReportSink = match (storage.report_sink, &database) {
        (SinkKind::Local, Some(db)) => db.clone(),
        _ => Arc::new(PlatformReportSink::from_env(client.clone())?),
    };
    let charges: SharedChargeSink = match (storage.charge_sink, &database) {
        (SinkKind::Local, Some(db)) => db.clone(),
        _ => Arc::new(PlatformChargeSink::new(client.clone())),
    };
    Ok((reports, charges))
}

fn run_id(config: &Config) -> Result<RunId> {
    match config.storage.charge_sink {
        SinkKind::Platform => PlatformChargeSink::run_id_from_env(),
        SinkKind::Local => Ok(local_run_id()),
    }
}

pub async fn run(options: InspectOptions) -> Result<()> {
    let out = Output::quiet(options.quiet);

    let mut config = ConfigLoader::load()?;
    apply_platform_env(&mut config)?;
    if let Some(kind) = options.report_sink {
        config.storage.report_sink = kind;
    }
    if let Some(kind) = options.charge_sink {
        config.storage.charge_sink = kind;
    }

    let client = Arc::new(ApifyClient::from_env(&config.platform)?);
    let platform_record = match &options.input {
        Some(_) => None,
        None => platform_input(&client).await?,
    };
    let input = build_input(&options, platform_record)?;
    let request = InspectionRequest::from_input(&input, &config)?;

    let provider = create_provider(&ProviderConfig::from_llm_config(&config.llm, &request.model))?;
    let source: SharedSource = client.clone();
    let (reports, charges) = select_sinks(&config, &client)?;
    let run_id = run_id(&config)?;

    out.info(&format!(
        "Inspecting {} with {} (run {})",
        request.actor, request.model, run_id
    ));

    let pipeline = InspectionPipeline::new(config, provider, source, reports, charges);
    let outcome = pipeline.run(run_id, &request).await?;
    let report = &outcome.report;

    out.section("Ratings");
    for result in &report.results {
        out.rating(result.category.title(), result.rating);
    }
    out.rating("Overall", report.overall);
    for gap in report.gaps() {
        out.warning(gap);
    }

    match &options.output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &report.markdown)?;
            out.success(&format!("Report written to {}", path.display()));
        }
        None => println!("{}", report.markdown),
    }

    out.success(&format!(
        "Inspection of {} finished: {} ({} tokens)",
        report.actor,
        styled_rating(report.overall),
        outcome.metrics.total_tokens
    ));
    tracing::debug!("{}", outcome.metrics.display());
    Ok(())
}
