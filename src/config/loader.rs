//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (`<config dir>/repodoc/config.toml`)
//! 3. Project config (`.repodoc.toml`)
//! 4. Environment variables (`REPODOC_` prefix, e.g. `REPODOC_COMPLETION__MODEL`)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{RepoDocError, Result};

/// Project-level config file name
const PROJECT_CONFIG_FILE: &str = ".repodoc.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        figment = figment.merge(Env::prefixed("REPODOC_").split("__"));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only (defaults underneath)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| RepoDocError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Platform config directory for repodoc
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repodoc").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Print config file locations and whether they exist
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

    /// Render the effective configuration (credentials omitted)
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| RepoDocError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a commented default config to `path` unless it exists (or `force`)
    pub fn init_at(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(false);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config_template())?;
        info!("Created config: {}", path.display());
        Ok(true)
    }

    pub fn init_global(force: bool) -> Result<PathBuf> {
        let path = Self::global_config_path().ok_or_else(|| {
            RepoDocError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::init_at(&path, force)?;
        Ok(path)
    }

    pub fn init_project(force: bool) -> Result<PathBuf> {
        let path = Self::project_config_path();
        Self::init_at(&path, force)?;
        Ok(path)
    }

    fn default_config_template() -> String {
        r#"# repodoc configuration
# Credentials are best supplied through the environment:
#   REPODOC_REPOSITORY__TOKEN, REPODOC_COMPLETION__API_KEY

version = "1.0"

[repository]
branches = ["main", "master", "develop"]
verify_tls = true

[completion]
# base_url = "https://api.openai.com"
model = "gpt-4o-mini"

[generation]
max_files = 100
max_chunk_size = 12000
"#
        .to_string()
    }
}
