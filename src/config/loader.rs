//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/actor-inspector/config.toml)
//! 3. Project config (.actor-inspector/config.toml)
//! 4. Environment variables (ACTOR_INSPECTOR_* prefix, `__` for nesting)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{InspectorError, Result};

const ENV_PREFIX: &str = "ACTOR_INSPECTOR_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load configuration from explicit global/project files plus environment
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // ACTOR_INSPECTOR_LLM__DEFAULT_MODEL -> llm.default_model
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| InspectorError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/actor-inspector/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("actor-inspector"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".actor-inspector")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| InspectorError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            InspectorError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, Self::default_global_config(), force)?;
        Ok(global_dir)
    }

    /// Initialize project configuration in the current directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        Self::write_default(&project_dir, Self::default_project_config(), force)?;
        Ok(project_dir)
    }

    fn write_default(dir: &Path, content: String, force: bool) -> Result<()> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, content)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# Actor Inspector Global Configuration
# User-wide defaults. Settings in .actor-inspector/config.toml override these.
# Secrets are read from OPENAI_API_KEY and APIFY_TOKEN, never from this file.

version = "1.0"

[llm]
provider = "openai"
default_model = "gpt-4o-mini"
supported_models = ["gpt-4o-mini", "gpt-4o", "o1", "o3-mini"]
timeout_secs = 300
task_timeout_secs = 600
max_tool_iterations = 8

[billing]
run_start_price_usd = 0.005
task_completed_price_usd = 0.10
"#
        .to_string()
    }

    fn default_project_config() -> String {
        r#"# Actor Inspector Project Configuration

version = "1.0"

[inspection]
pedantic = true
search_limit = 10

[storage]
database_path = ".actor-inspector/inspector.db"
# "local" (SQLite) or "platform" (dataset / charge endpoint)
report_sink = "local"
charge_sink = "local"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkKind;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_from(None, &temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(
            &global,
            "[llm]\ntemperature = 0.5\n[storage]\nreport_sink = \"platform\"\n",
        )
        .unwrap();
        fs::write(&project, "[llm]\ntemperature = 0.2\n").unwrap();

        let config = ConfigLoader::load_from(Some(&global), &project).unwrap();
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.storage.report_sink, SinkKind::Platform);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("project.toml");
        fs::write(&project, "[storage]\nreport_sink = \"s3\"\n").unwrap();

        let err = ConfigLoader::load_from(None, &project).unwrap_err();
        assert!(matches!(err, InspectorError::Config(_)));
    }

    #[test]
    fn test_default_templates_parse() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, ConfigLoader::default_global_config()).unwrap();
        fs::write(&project, ConfigLoader::default_project_config()).unwrap();

        let config = ConfigLoader::load_from(Some(&global), &project).unwrap();
        assert_eq!(config.llm.max_tool_iterations, 8);
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("ACTOR_INSPECTOR_INSPECTION__SEARCH_LIMIT", "42");
        }
        let config =
            ConfigLoader::load_from(None, &temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.inspection.search_limit, 42);
        unsafe {
            std::env::remove_var("ACTOR_INSPECTOR_INSPECTION__SEARCH_LIMIT");
        }
    }
}
