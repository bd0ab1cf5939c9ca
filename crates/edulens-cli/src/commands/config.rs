//! `edulens config show|set`.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use edulens_config::Config;

/// Print the config file followed by the locations it resolves to.
pub fn show() -> Result<()> {
    let paths = get_paths()?;
    if !paths.is_initialized() {
        anyhow::bail!("Config file not found. Run 'edulens init' first.");
    }

    let config = Config::load_from(&paths.config_file).context("Failed to load configuration")?;
    let contents =
        std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;

    println!("{} {}", "Config".cyan().bold(), paths.config_file.display());
    println!("{}", "─".repeat(50));
    println!("{}", contents.trim_end());
    println!("{}", "─".repeat(50));
    println!("  Database: {}", config.database_file(&paths).display());
    println!("  Uploads:  {}", config.uploads_dir(&paths).display());

    Ok(())
}

/// Assign one dotted key, e.g. `processing.chunk_size`, and save.
pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;
    let mut config = Config::load_from(&paths.config_file).context("Failed to load configuration")?;

    config
        .set(key, value)
        .with_context(|| format!("Cannot set {}", key))?;
    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}
