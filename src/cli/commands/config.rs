//! Config Command
//!
//! Usage:
//!   repodoc config show [--json]
//!   repodoc config path
//!   repodoc config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the effective configuration (defaults, files and environment merged)
pub fn show(as_json: bool, out: Output) -> Result<()> {
    let config = ConfigLoader::load()?;
    out.result(&ConfigLoader::render(&config, as_json)?);
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool, out: Output) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    let scope = if global { "global" } else { "project" };
    out.success(&format!("Initialized {} configuration", scope));
    out.field("Config", path.display());
    Ok(())
}
