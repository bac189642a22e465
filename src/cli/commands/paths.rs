//! Path alias commands: `resolve`, `relative`, `absolute`

use miette::Result;

use crate::cli::output::print_value;
use crate::cli::GlobalOpts;
use crate::core::alias::PathResolver;
use crate::core::config::DbConfig;
use crate::core::database::Database;

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Path in any known spelling (drive letter, mount, barelydb:// URI)
    pub path: String,
}

#[derive(clap::Args, Debug)]
pub struct RelativeArgs {
    /// Path in any known spelling
    pub path: String,
}

#[derive(clap::Args, Debug)]
pub struct AbsoluteArgs {
    /// Path relative to the database root
    pub path: String,
}

/// Resolver for the selected database; the tree is not scanned
fn resolver(global: &GlobalOpts) -> Result<PathResolver> {
    let root = Database::locate_root(global.root.as_deref())?;
    let root = root.canonicalize().unwrap_or(root);
    let config = DbConfig::load(&root)?;
    Ok(PathResolver::new(&root, config.known_bases.as_slice())?)
}

pub fn run_resolve(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let resolved = resolver(global)?.resolve(&args.path);
    print_value(global.format, "path", &resolved)
}

pub fn run_relative(args: RelativeArgs, global: &GlobalOpts) -> Result<()> {
    let relative = resolver(global)?.relative(&args.path)?;
    print_value(global.format, "path", &relative)
}

pub fn run_absolute(args: AbsoluteArgs, global: &GlobalOpts) -> Result<()> {
    let absolute = resolver(global)?.absolute(&args.path)?;
    print_value(global.format, "path", &absolute)
}
