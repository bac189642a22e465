//! Shared helper functions for CLI commands

use miette::Result;
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::database::Database;

/// Open the database selected by the global options
pub fn open_database(global: &GlobalOpts) -> Result<Database> {
    Ok(Database::open_auto(global.root.as_deref())?)
}

/// Display `path` relative to `root` when it lies inside it
pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// Truncate a string to max_len chars, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
