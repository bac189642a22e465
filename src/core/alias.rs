//! Path alias resolution
//!
//! The same database tree is reachable under many names: a Windows drive
//! letter, a POSIX mount point, or a `barelydb://` style URI. The
//! [`PathResolver`] maps all of them onto one canonical root.

use regex::Regex;
use std::path::{Path, PathBuf};
use miette::Diagnostic;
use thiserror::Error;

/// Separator characters accepted on input
const SEPARATORS: [char; 2] = ['/', '\\'];

#[derive(Debug, Clone)]
struct Alias {
    prefix: String,
    pattern: Regex,
}

/// Translates aliased paths to canonical absolute paths under one root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: String,
    separator: char,
    aliases: Vec<Alias>,
}

impl PathResolver {
    /// Create a resolver for `root` knowing the given alias prefixes
    ///
    /// Prefixes are matched case-insensitively, in the given order.
    pub fn new<S: AsRef<str>>(root: &Path, known_bases: &[S]) -> Result<Self, ResolveError> {
        let root_str = root.to_string_lossy().to_string();
        let separator = if root_str.contains('\\') && !root_str.contains('/') {
            '\\'
        } else {
            '/'
        };

        // Keep a bare "/" or "C:\" intact
        let trimmed = root_str.trim_end_matches(SEPARATORS);
        let root = if trimmed.is_empty() || trimmed.ends_with(':') {
            root_str.clone()
        } else {
            trimmed.to_string()
        };

        let aliases = known_bases
            .iter()
            .map(|prefix| {
                let prefix = prefix.as_ref();
                let pattern = Regex::new(&format!("(?i)^{}", regex::escape(prefix)))
                    .map_err(|e| ResolveError::InvalidAlias(prefix.to_string(), e.to_string()))?;
                Ok(Alias {
                    prefix: prefix.to_string(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, ResolveError>>()?;

        Ok(Self {
            root,
            separator,
            aliases,
        })
    }

    /// The canonical root as text
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The separator style of the canonical root
    pub fn separator(&self) -> char {
        self.separator
    }

    /// The configured alias prefixes, in match order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(|a| a.prefix.as_str())
    }

    fn root_with_separator(&self) -> String {
        if self.root.ends_with(SEPARATORS) {
            self.root.clone()
        } else {
            format!("{}{}", self.root, self.separator)
        }
    }

    /// Translate any known alias at the start of `raw` to the canonical root
    pub fn resolve(&self, raw: &str) -> String {
        let mut out = raw.to_string();

        for alias in &self.aliases {
            if let Some(m) = alias.pattern.find(&out) {
                let rest = out[m.end()..].trim_start_matches(SEPARATORS);
                out = format!("{}{}", self.root_with_separator(), rest);
            }
        }

        // A path that still is a URI was not ours to translate
        if !out.contains("://") {
            let other = if self.separator == '/' { '\\' } else { '/' };
            if raw.contains(other) || out.contains(other) {
                out = out.replace(other, &self.separator.to_string());
            }
            out = self.normalize_under_root(out);
        }

        out
    }

    /// Lexically clean the part below the root; paths elsewhere stay as given
    fn normalize_under_root(&self, path: String) -> String {
        let Some(rest) = path.strip_prefix(&self.root_with_separator()) else {
            return path;
        };
        match normalize_components(rest) {
            Some(parts) if parts.is_empty() => self.root.clone(),
            Some(parts) => format!(
                "{}{}",
                self.root_with_separator(),
                parts.join(&self.separator.to_string())
            ),
            None => path,
        }
    }

    /// Like [`resolve`](Self::resolve), as a `PathBuf`
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        PathBuf::from(self.resolve(raw))
    }

    /// Express `raw` relative to the root, using forward slashes
    pub fn relative(&self, raw: &str) -> Result<String, ResolveError> {
        let resolved = self.resolve(raw);

        let rest = if resolved == self.root {
            ""
        } else if let Some(rest) = resolved.strip_prefix(&self.root_with_separator()) {
            rest
        } else {
            return Err(ResolveError::OutOfScope {
                path: raw.to_string(),
                root: self.root.clone(),
            });
        };

        let parts = normalize_components(rest).ok_or_else(|| ResolveError::OutOfScope {
            path: raw.to_string(),
            root: self.root.clone(),
        })?;
        Ok(parts.join("/"))
    }

    /// Join a root-relative path onto the canonical root
    pub fn absolute(&self, relative: &str) -> Result<String, ResolveError> {
        let parts = normalize_components(relative).ok_or_else(|| ResolveError::OutOfScope {
            path: relative.to_string(),
            root: self.root.clone(),
        })?;

        if parts.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(format!(
            "{}{}",
            self.root_with_separator(),
            parts.join(&self.separator.to_string())
        ))
    }
}

/// Lexically resolve `.` and `..`; `None` if the path climbs above its start
fn normalize_components(path: &str) -> Option<Vec<&str>> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(SEPARATORS) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts)
}

/// Errors raised while translating paths
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("path '{path}' is not inside the database root '{root}'")]
    OutOfScope { path: String, root: String },

    #[error("invalid alias prefix '{0}': {1}")]
    InvalidAlias(String, String),
}
