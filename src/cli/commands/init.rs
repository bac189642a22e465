//! `bdb init` command - Initialize a database

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::config::DbConfig;
use crate::core::database::{Database, DatabaseError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Database name (used to find base paths in the system config)
    #[arg(long)]
    pub name: Option<String>,

    /// Entity folder depth below the root (0 = direct children)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Overwrite an existing .bdb/config.yaml
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    let mut config = DbConfig::default();
    if let Some(name) = args.name {
        config.name = name;
    }
    if let Some(depth) = args.depth {
        config.path_depth = depth;
    }

    match Database::init(&path, &config, args.force) {
        Ok(root) => {
            println!(
                "{} Initialized database {} at {}",
                style("✓").green(),
                style(&config.name).bold(),
                style(root.display()).cyan()
            );
            println!();
            println!("Entity folders are found {} level(s) below the root.", config.path_depth + 1);
            println!("Next steps:");
            println!(
                "  {} Create a first entity folder per type by hand, e.g. Webs/WB0001_first",
                style("mkdir").yellow()
            );
            println!("  {} List entities", style("bdb entities").yellow());
            println!(
                "  {} Allocate the next identifier of a type",
                style("bdb new web --comment ...").yellow()
            );
            Ok(())
        }
        Err(DatabaseError::AlreadyExists(path)) => {
            println!(
                "{} Database already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to rewrite its config", style("bdb init --force").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
