//! `anchorna create`: write an example configuration

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

pub fn execute(conf: &Path, no_cds: bool) -> Result<()> {
    if conf.exists() {
        log::warn!("Overwrite existing configuration file {}", conf.display());
    }
    std::fs::write(conf, Config::example_toml(no_cds))
        .with_context(|| format!("Failed to write configuration file: {}", conf.display()))?;
    log::info!("Example configuration written to {}", conf.display());
    Ok(())
}
