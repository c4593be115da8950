//! History Commands
//!
//! Browse reports persisted by local runs.
//!
//! Usage:
//!   actor-inspector history [--actor owner/name] [--limit 20] [-f json]
//!   actor-inspector show <run_id> [--sections]

use serde_json::json;

use crate::cli::ui::Output;
use crate::cli::ui::output::styled_rating;
use crate::cli::util::require_database;
use crate::config::ConfigLoader;
use crate::publish::ChargeEvent;
use crate::storage::ReportSummary;
use crate::types::{ActorId, Result};

fn summary_json(summary: &ReportSummary) -> serde_json::Value {
    json!({
        "runId": summary.run_id,
        "actorId": summary.actor_id,
        "model": summary.model,
        "overallRating": summary.overall_rating,
        "totalTokens": summary.total_tokens,
        "digest": summary.digest,
        "createdAt": summary.created_at,
    })
}

/// List stored reports, newest first
pub fn run(actor: Option<&str>, limit: usize, format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    let db = require_database(&config)?;

    let actor = actor.map(ActorId::parse).transpose()?;
    let reports = db.list_reports(actor.as_ref().map(ActorId::as_str), limit)?;

    if format == "json" {
        let rows: Vec<_> = reports.iter().map(summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No reports yet.");
        return Ok(());
    }

    println!(
        "{:<38} {:<32} {:<8} {:>8}  {}",
        "RUN", "ACTOR", "RATING", "TOKENS", "CREATED"
    );
    for summary in &reports {
        println!(
            "{:<38} {:<32} {:<8} {:>8}  {}",
            summary.run_id,
            summary.actor_id,
            styled_rating(summary.overall_rating),
            summary.total_tokens,
            summary.created_at
        );
    }
    Ok(())
}

/// Print one stored report
pub fn show(run_id: &str, sections: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let db = require_database(&config)?;
    let report = db.load_report(run_id)?;

    if !sections {
        println!("{}", report.markdown);
        return Ok(());
    }

    let out = Output::new();
    out.section(&format!(
        "{} ({}, {})",
        report.summary.actor_id, report.summary.model, report.summary.created_at
    ));
    for section in &report.sections {
        out.rating(section.category.title(), section.rating);
        for gap in &section.gaps {
            out.warning(gap);
        }
    }
    out.rating("Overall", report.summary.overall_rating);

    let charges = db.charges_for_run(run_id)?;
    if !charges.is_empty() {
        let total: f64 = charges.iter().map(ChargeEvent::total_usd).sum();
        out.info(&format!(
            "Charged: {} (${:.4})",
            charges
                .iter()
                .map(|c| format!("{} x{}", c.event_name, c.count))
                .collect::<Vec<_>>()
                .join(", "),
            total
        ));
    }
    Ok(())
}
