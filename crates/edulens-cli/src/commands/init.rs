//! Initialize EduLens.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use edulens_config::Config;
use edulens_db::Database;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} EduLens is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing EduLens...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    let _db = Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );
    println!(
        "  {} Upload store: {}",
        "✓".green(),
        paths.uploads_dir.display()
    );

    if !edulens_process::all_tools_available() {
        println!();
        println!(
            "{} Audio and video uploads need these tools on PATH:",
            "Note:".yellow().bold()
        );
        for (tool, available) in edulens_process::check_dependencies() {
            let mark = if available { "✓".green() } else { "✗".red() };
            println!("  {} {}", mark, tool);
        }
    }

    println!();
    println!("{}", "EduLens initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Start Ollama: {}", "ollama serve".cyan());
    println!("  2. Upload material: {}", "edulens upload lecture.pdf".cyan());
    println!("  3. Browse topics: {}", "edulens topics <artifact-id>".cyan());

    Ok(())
}
