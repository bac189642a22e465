//! File commands: `files`, `revisions`

use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{display_path, open_database};
use crate::cli::output::Listing;
use crate::cli::GlobalOpts;
use crate::core::revision;

#[derive(clap::Args, Debug)]
pub struct FilesArgs {
    /// File name pattern (`*` and `?` wildcards)
    #[arg(default_value = "*")]
    pub glob: String,

    /// Only this entity (or component) instead of the whole database
    #[arg(long, short = 'e')]
    pub entity: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RevisionsArgs {
    /// File whose revision chain to show (any known path spelling)
    pub file: String,
}

pub fn run_files(args: FilesArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let mut listing = Listing::new(&["ID", "File"]);

    match &args.entity {
        Some(text) => {
            let handle = db.entity(text)?;
            for path in handle.files(&args.glob)? {
                listing.push([handle.to_string(), display_path(&path, db.root())]);
            }
        }
        None => {
            for (buid, path) in db.discover_files(&args.glob)? {
                listing.push([buid.to_string(), display_path(&path, db.root())]);
            }
        }
    }

    listing.print(global.format, "file")
}

pub fn run_revisions(args: RevisionsArgs, global: &GlobalOpts) -> Result<()> {
    // Resolve aliases only when a database is around
    let path = match open_database(global) {
        Ok(db) => db.resolver().resolve_path(&args.file),
        Err(_) => std::path::PathBuf::from(&args.file),
    };

    let chain = revision::revisions(&path).into_diagnostic()?;
    if chain.is_empty() {
        return Err(miette::miette!("File not found: {}", path.display()));
    }

    let mut listing = Listing::new(&["Revision", "File", "Size", "Modified", "SHA256"]);
    for info in chain {
        listing.push([
            info.index.to_string(),
            info.path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            info.size.to_string(),
            info.modified
                .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            info.digest[..12.min(info.digest.len())].to_string(),
        ]);
    }
    listing.print(global.format, "revision")
}
