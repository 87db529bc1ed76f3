// CLI module - the `config` subcommand
//
// `sighting-tracker` with no subcommand opens the map. `config` inspects or
// resets the TOML file that `Config::from_env` layers under the env vars.

use crate::config::{Config, VERSION};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Sighting tracker - live map overlays for a sightings backend
#[derive(Parser)]
#[command(name = "sighting-tracker")]
#[command(version = VERSION)]
#[command(about = "Select, report and follow sightings on a map", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or reset the config file
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,

        /// Overwrite the config file with the default template
        #[arg(long)]
        reset: bool,

        /// Print where the config file lives
        #[arg(long)]
        path: bool,
    },
}

/// Run a subcommand if one was given; `Ok(true)` means exit afterwards
pub fn handle_cli() -> Result<bool> {
    let Some(Commands::Config { show, reset, path }) = Cli::parse().command else {
        return Ok(false);
    };

    if path {
        println!("{}", config_file()?.display());
    } else if show {
        show_effective();
    } else if reset {
        reset_to_defaults()?;
    } else {
        println!("Usage: sighting-tracker config [--show|--reset|--path]");
    }
    Ok(true)
}

fn config_file() -> Result<PathBuf> {
    Config::config_path().context("Could not determine config path (no home directory)")
}

fn show_effective() {
    let config = Config::from_env();
    let source = match Config::config_path() {
        Some(path) if path.exists() => path.display().to_string(),
        _ => "defaults (no config file)".to_string(),
    };

    println!("# Effective configuration (env > file > defaults)");
    println!("# Source: {}", source);
    println!("# demo_mode = {} (SIGHTING_DEMO)", config.demo_mode);
    println!();
    print!("{}", config.to_toml());
}

fn reset_to_defaults() -> Result<()> {
    let path = config_file()?;

    if path.exists() && !confirm(&format!("Overwrite {}?", path.display()))? {
        println!("Aborted.");
        return Ok(());
    }

    Config::write_default(&path)?;
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

/// Ask a yes/no question on stderr; anything but `y` is no
fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
