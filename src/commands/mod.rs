pub mod check;
pub mod probe;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;

use sentinela::config::Config;

// Re-export command functions for convenience
pub use check::check_config;
pub use probe::probe;
pub use run::run;

/// Load and validate the configuration file
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Cannot start without {}", path.display()))
}

/// Like [`load_config`], but fall back to defaults when the file is absent
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }

    let mut config = Config::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
