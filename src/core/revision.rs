//! Revisioned file store
//!
//! Saving over an existing file keeps the previous content as a numbered
//! sibling: `F` is always the newest content, `F.1` the one before, `F.2`
//! older still, and so on without gaps.

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a write did to the revision chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist before
    Created,
    /// Existing content was byte-identical; nothing was written
    Unchanged,
    /// Existing content was replaced without keeping a revision
    Overwritten,
    /// Existing content was rotated into the chain. `collapsed` is set when
    /// the new `.1` duplicated `.2` and was folded away.
    Revised { collapsed: bool },
}

/// A single rename of a chain member; index 0 is the unnumbered file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationStep {
    pub from: usize,
    pub to: usize,
}

/// Metadata about one member of a revision chain
#[derive(Debug, Clone)]
pub struct RevisionInfo {
    pub index: usize,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub digest: String,
}

/// Path of chain member `index` (0 is the base file itself)
pub fn revision_path(base: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}", index));
    base.with_file_name(name)
}

/// Highest existing revision index, counting contiguously from 1
pub fn highest_revision(base: &Path) -> usize {
    let mut highest = 0;
    while revision_path(base, highest + 1).exists() {
        highest += 1;
    }
    highest
}

/// Renames that shift the whole chain one step older
///
/// Steps run from the highest index downward so no member is overwritten
/// before it has been moved out of the way.
pub fn rotation_plan(highest: usize) -> Vec<RotationStep> {
    (0..=highest)
        .rev()
        .map(|from| RotationStep { from, to: from + 1 })
        .collect()
}

/// Renames that close a hole at `gap`, shifting older members one step newer
///
/// Steps run from the lowest index upward, each target having just been
/// vacated.
pub fn compaction_plan(gap: usize, highest: usize) -> Vec<RotationStep> {
    (gap + 1..=highest)
        .map(|from| RotationStep { from, to: from - 1 })
        .collect()
}

fn execute(base: &Path, plan: &[RotationStep]) -> io::Result<()> {
    for step in plan {
        fs::rename(revision_path(base, step.from), revision_path(base, step.to))?;
    }
    Ok(())
}

fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    let meta_a = fs::metadata(a)?;
    let meta_b = fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(fs::read(a)? == fs::read(b)?)
}

/// Write `bytes` to `target`, rotating differing old content into the chain
pub fn write(target: &Path, bytes: &[u8], keep_revisions: bool) -> io::Result<WriteOutcome> {
    if !target.exists() {
        fs::write(target, bytes)?;
        tracing::debug!(path = %target.display(), "created file");
        return Ok(WriteOutcome::Created);
    }

    if fs::read(target)? == bytes {
        tracing::debug!(path = %target.display(), "content unchanged, write skipped");
        return Ok(WriteOutcome::Unchanged);
    }

    if !keep_revisions {
        fs::write(target, bytes)?;
        return Ok(WriteOutcome::Overwritten);
    }

    let highest = highest_revision(target);
    execute(target, &rotation_plan(highest))?;
    fs::write(target, bytes)?;
    tracing::info!(path = %target.display(), revisions = highest + 1, "created new revision");

    let newest = revision_path(target, 1);
    let older = revision_path(target, 2);
    if older.exists() && same_content(&newest, &older)? {
        fs::remove_file(&newest)?;
        execute(target, &compaction_plan(1, highest + 1))?;
        tracing::info!(
            path = %target.display(),
            "newest revision matched the previous one and was removed"
        );
        return Ok(WriteOutcome::Revised { collapsed: true });
    }

    Ok(WriteOutcome::Revised { collapsed: false })
}

/// List the chain of `base`, newest first (index 0 is the base file)
pub fn revisions(base: &Path) -> io::Result<Vec<RevisionInfo>> {
    let mut chain = Vec::new();
    if !base.exists() {
        return Ok(chain);
    }

    for index in 0..=highest_revision(base) {
        let path = revision_path(base, index);
        let metadata = fs::metadata(&path)?;
        let content = fs::read(&path)?;

        let mut hasher = Sha256::new();
        hasher.update(&content);

        chain.push(RevisionInfo {
            index,
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
            digest: format!("{:x}", hasher.finalize()),
            path,
        });
    }
    Ok(chain)
}
