//! Init command

use anyhow::{Context as _, Result};
use colored::Colorize;
use std::path::Path;

use crate::data::{DataFile, DataLock, LOCK_WAIT};

pub fn handle(data: &Path, config: Option<&Path>, force: bool) -> Result<()> {
    if data.exists() && !force {
        println!("Data file {} already exists (use --force to reset)", data.display());
    } else {
        let _lock = if data.exists() { Some(DataLock::acquire(data, LOCK_WAIT)?) } else { None };
        DataFile::default().write(data)?;
        println!("{} {}", "Created".green(), data.display());
    }

    let config_path = match config {
        Some(path) => path.to_path_buf(),
        None => crate::config::default_path().context("cannot find home directory")?,
    };
    if crate::config::write_default(&config_path, force)? {
        println!("{} {}", "Wrote default config to".green(), config_path.display());
    } else {
        println!("Keeping existing config {}", config_path.display());
    }
    Ok(())
}
