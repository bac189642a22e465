//! File listing inside entity folders
//!
//! Glob matching over the immediate children of a directory, skipping
//! platform artifacts and cloud-sync duplicates.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Conflict copies created by sync clients, e.g. "data (1).yaml"
    static ref SYNC_DUPLICATE: Regex = Regex::new(r" \(1\)").unwrap();
    static ref INVALID_FILENAME_CHARS: Regex = Regex::new(r#"[\\/:"*?<>|]+"#).unwrap();
}

/// Which directory entries a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Files,
    Directories,
    Any,
}

/// Translate a shell glob (`*`, `?`) into an anchored regex
pub fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(r"[^/\\]*"),
            '?' => pattern.push_str(r"[^/\\]"),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');
    // Every non-wildcard character is escaped, so the pattern is always valid
    Regex::new(&pattern).unwrap()
}

/// Whether `name` is a sync-client conflict copy
pub fn is_sync_duplicate(name: &str) -> bool {
    SYNC_DUPLICATE.is_match(name)
}

/// Strip characters that are invalid in file names on common platforms
pub fn regularize_filename(name: &str) -> String {
    INVALID_FILENAME_CHARS.replace_all(name, "").into_owned()
}

/// List children of `dir` whose names match `glob`, sorted by name
///
/// A missing directory yields an empty list.
pub fn list(dir: &Path, glob: &str, kind: EntryKind, ignored: &[String]) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let matcher = glob_to_regex(glob);
    let mut found = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if !matcher.is_match(&name) || is_sync_duplicate(&name) {
            continue;
        }
        if ignored.iter().any(|i| i.eq_ignore_ascii_case(&name)) {
            continue;
        }

        let is_dir = entry.file_type()?.is_dir();
        let wanted = match kind {
            EntryKind::Files => !is_dir,
            EntryKind::Directories => is_dir,
            EntryKind::Any => true,
        };
        if wanted {
            found.push(entry.path());
        }
    }

    found.sort();
    Ok(found)
}
