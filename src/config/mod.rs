//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (platform config dir, `repodoc/config.toml`)
//! 3. Project config (`.repodoc.toml`)
//! 4. Environment variables (`REPODOC_*`, `__` separates sections)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
