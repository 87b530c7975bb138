//! `kreate.toml`: defaults for every command-line flag.
//!
//! Missing keys and tables fall back to defaults. Saves are atomic, and a
//! single table can be rewritten without touching the rest of the file.
//!
//! # Example
//!
//! ```no_run
//! use kreate_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/kreate.toml");
//! config.load_or_create().unwrap();
//! config.settings_mut().run.parallel = true;
//! config.update_section(ConfigSection::Run).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PathSettings, PlannerSettings, RunSettings, Settings,
    ToolSettings, TrimSettings,
};
