//! Opening paths in the platform file browser

use std::path::Path;
use std::process::Command;

/// Something that can show a path to the user
pub trait PathOpener {
    /// Open `path`; failures are reported, never raised
    fn open_path(&self, path: &Path);
}

/// Opens paths with the desktop's file browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl SystemOpener {
    /// The command that would be run for `path`
    pub fn command_for(path: &Path) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("explorer");
            if path.is_file() {
                cmd.arg(format!("/select,{}", path.display()));
            } else {
                cmd.arg(path);
            }
            cmd
        } else if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            if path.is_file() {
                cmd.arg("-R");
            }
            cmd.arg(path);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            // xdg-open cannot select a file, show its folder instead
            match path.parent().filter(|_| path.is_file()) {
                Some(dir) => cmd.arg(dir),
                None => cmd.arg(path),
            };
            cmd
        }
    }
}

impl PathOpener for SystemOpener {
    fn open_path(&self, path: &Path) {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "cannot open missing path");
            return;
        }
        let mut cmd = Self::command_for(path);
        match cmd.spawn() {
            Ok(_) => tracing::debug!(path = %path.display(), "opened in file browser"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to open file browser"),
        }
    }
}
