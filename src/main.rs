use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use actor_inspector::cli::commands::inspect::InspectOptions;
use actor_inspector::config::SinkKind;
use actor_inspector::types::json_bool;
use actor_inspector::{InspectionRequest, InspectorError};

/// Parse a sink kind from string
fn parse_sink(s: &str) -> Result<SinkKind, String> {
    match s.to_lowercase().as_str() {
        "local" => Ok(SinkKind::Local),
        "platform" => Ok(SinkKind::Platform),
        _ => Err(format!("Invalid sink '{}'. Valid values: local, platform", s)),
    }
}

#[derive(Parser)]
#[command(name = "actor-inspector")]
#[command(
    version,
    about = "Multi-agent LLM inspector that rates Apify Actors and writes a markdown report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect an Actor and print its report
    Inspect {
        #[arg(help = "Actor to inspect, as owner/name")]
        actor: Option<String>,
        #[arg(long, short, help = "Input document (JSON, or YAML for .yaml/.yml)")]
        input: Option<PathBuf>,
        #[arg(long, short, help = "Model to use")]
        model: Option<String>,
        #[arg(long, conflicts_with = "no_pedantic", help = "Grade strictly")]
        pedantic: bool,
        #[arg(long, help = "Grade without the strictness instruction")]
        no_pedantic: bool,
        #[arg(long, help = "Log every prompt sent to the model")]
        debug: bool,
        #[arg(long, short, help = "Write the report to a file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, value_parser = parse_sink, help = "Report destination: local, platform")]
        report_sink: Option<SinkKind>,
        #[arg(long, value_parser = parse_sink, help = "Billing destination: local, platform")]
        charge_sink: Option<SinkKind>,
    },

    /// List stored reports
    History {
        #[arg(long, short, help = "Only reports for this Actor")]
        actor: Option<String>,
        #[arg(long, short, default_value = "20")]
        limit: usize,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Print a stored report
    Show {
        #[arg(help = "Run ID of the report")]
        run_id: String,
        #[arg(long, help = "Show section ratings and charges instead of the markdown")]
        sections: bool,
    },

    /// List supported models
    Models,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mactor-inspector encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<InspectorError>() {
                Some(err) => eprintln!("\x1b[31m{}:\x1b[0m {}", err.kind(), err),
                None => eprintln!("\x1b[31mError:\x1b[0m {}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let debug_prompts = match &cli.command {
        Commands::Inspect { debug: true, .. } => true,
        Commands::Inspect {
            input: Some(path), ..
        } => InspectionRequest::load_input(path)
            .map(|input| json_bool(&input, "debug", false))
            .unwrap_or(false),
        _ => false,
    };
    let filter = if cli.verbose || debug_prompts {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Inspect {
            actor,
            input,
            model,
            pedantic,
            no_pedantic,
            debug,
            output,
            report_sink,
            charge_sink,
        } => {
            let pedantic = match (pedantic, no_pedantic) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let rt = Runtime::new()?;
            rt.block_on(actor_inspector::cli::commands::inspect::run(InspectOptions {
                actor,
                model,
                pedantic,
                debug,
                input,
                output,
                report_sink,
                charge_sink,
                quiet: cli.quiet,
            }))?;
        }
        Commands::History {
            actor,
            limit,
            format,
        } => {
            actor_inspector::cli::commands::history::run(actor.as_deref(), limit, &format)?;
        }
        Commands::Show { run_id, sections } => {
            actor_inspector::cli::commands::history::show(&run_id, sections)?;
        }
        Commands::Models => {
            actor_inspector::cli::commands::config::models()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                actor_inspector::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                actor_inspector::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    actor_inspector::cli::commands::config::init_global(force)?;
                } else {
                    actor_inspector::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
