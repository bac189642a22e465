//! `bdb config` command - show configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::output::Listing;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{DbConfig, SystemConfig};
use crate::core::database::Database;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective database configuration
    Show,

    /// Show paths to configuration files
    Path,

    /// List the known entity types
    Types,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Types => run_types(global),
    }
}

/// Config of the selected database, defaults when there is none
fn load(global: &GlobalOpts) -> Result<(Option<std::path::PathBuf>, DbConfig)> {
    match Database::locate_root(global.root.as_deref()) {
        Ok(root) => {
            let config = DbConfig::load(&root)?;
            Ok((Some(root), config))
        }
        Err(_) => Ok((None, DbConfig::default())),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let (root, config) = load(global)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
        }
        _ => {
            if global.format == OutputFormat::Auto && !global.quiet {
                match &root {
                    Some(root) => eprintln!(
                        "{} {}",
                        style("Database at").dim(),
                        style(root.display()).cyan()
                    ),
                    None => eprintln!("{}", style("No database found, showing defaults").yellow()),
                }
            }
            print!("{}", serde_yml::to_string(&config).into_diagnostic()?);
        }
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let (root, _) = load(global)?;

    let mut listing = Listing::new(&["Scope", "Path", "Exists"]);
    if let Some(root) = root {
        let path = DbConfig::path(&root);
        listing.push([
            "database".to_string(),
            path.display().to_string(),
            path.exists().to_string(),
        ]);
    }
    if let Some(path) = SystemConfig::path() {
        listing.push([
            "system".to_string(),
            path.display().to_string(),
            path.exists().to_string(),
        ]);
    }
    listing.print(global.format, "config file")
}

fn run_types(global: &GlobalOpts) -> Result<()> {
    let (_, config) = load(global)?;

    let mut listing = Listing::new(&["Code", "Name"]);
    for (name, code) in config.buid_types.iter() {
        listing.push([code, name]);
    }
    listing.print(global.format, "type")
}
