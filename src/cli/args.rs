//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs,
    config::ConfigCommands,
    entities::{ComponentsArgs, EntitiesArgs, FreeArgs, NewArgs, NewComponentArgs, PathArgs},
    files::{FilesArgs, RevisionsArgs},
    init::InitArgs,
    open::OpenArgs,
    parse::ParseArgs,
    paths::{AbsoluteArgs, RelativeArgs, ResolveArgs},
    props::PropsArgs,
};

#[derive(Parser)]
#[command(name = "bdb")]
#[command(author, version, about = "barely-db: a database made of folders")]
#[command(long_about = "Addresses entities stored as folders named by typed identifiers (WB0251_coated, -D2 components) on a shared drive, and keeps revisioned object files inside them.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log debug details to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Database root (default: $BDB_ROOT, then the nearest .bdb/ above the working directory)
    #[arg(long, global = true, env = "BDB_ROOT")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a database at a directory
    Init(InitArgs),

    /// List entities
    Entities(EntitiesArgs),

    /// Print the folder of an entity or component
    Path(PathArgs),

    /// List the components of an entity
    Components(ComponentsArgs),

    /// Find free identifiers
    Free(FreeArgs),

    /// Create an entity folder
    New(NewArgs),

    /// Create a component folder
    NewComponent(NewComponentArgs),

    /// Translate an aliased path to the canonical root
    Resolve(ResolveArgs),

    /// Express a path relative to the database root
    Relative(RelativeArgs),

    /// Turn a root-relative path into an absolute one
    Absolute(AbsoluteArgs),

    /// Extract identifiers from text
    Parse(ParseArgs),

    /// Find files in entity and component folders
    Files(FilesArgs),

    /// Show the revision chain of a file
    Revisions(RevisionsArgs),

    /// Query a value from an entity's property files
    Props(PropsArgs),

    /// Show an entity folder or path in the file browser
    Open(OpenArgs),

    /// Database and system configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal, TSV when piped
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// YAML format
    Yaml,
    /// Just the first column, one per line
    Id,
}
