//! `bdb open` command - show a folder in the file browser

use miette::Result;

use crate::cli::helpers::open_database;
use crate::cli::GlobalOpts;
use crate::core::shell::{PathOpener, SystemOpener};

#[derive(clap::Args, Debug)]
pub struct OpenArgs {
    /// Identifier (WB0251, WB0251-D2) or a path in any known spelling
    pub target: String,

    /// Print the path instead of opening it
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: OpenArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;

    // A bare identifier opens its folder; anything else is treated as a path
    let path = match db.entity(&args.target) {
        Ok(handle) if !looks_like_path(&args.target) => handle.path()?,
        _ => db.resolver().resolve_path(&args.target),
    };

    if args.dry_run {
        println!("{}", path.display());
        return Ok(());
    }

    SystemOpener.open_path(&path);
    Ok(())
}

fn looks_like_path(text: &str) -> bool {
    text.contains(['/', '\\']) || text.contains("://")
}
