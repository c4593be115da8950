//! Config Command
//!
//! Manage actor-inspector configuration.
//!
//! Usage:
//!   actor-inspector config show [--json]
//!   actor-inspector config path
//!   actor-inspector config init [--global] [--force]
//!   actor-inspector models

use console::style;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective (merged) configuration
pub fn show(as_json: bool) -> Result<()> {
    ConfigLoader::show_config(as_json)
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Directory: {}", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        println!("  Config:    {}", config_path.display());
    }
    Ok(())
}

/// Initialize project configuration
pub fn init_project(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_project(force)?;
    println!("✓ Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!(
        "  Config:    {}",
        ConfigLoader::project_config_path().display()
    );
    Ok(())
}

/// List the models a run may request
pub fn models() -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("Supported models ({}):", config.llm.provider);
    for model in &config.llm.supported_models {
        if *model == config.llm.default_model {
            println!("  {} {}", model, style("(default)").dim());
        } else {
            println!("  {}", model);
        }
    }
    Ok(())
}
