//! Configuration: per-database settings and the per-user system config
//!
//! The database config lives inside the tree (`.bdb/config.yaml`) so every
//! user of a shared drive sees the same type table and aliases. The system
//! config lives in the user's config directory and only says where
//! databases can be found on this machine.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::core::identity::TypeTable;
use crate::yaml::SyntaxError;

/// Name of the marker directory at the database root
pub const CONFIG_DIR: &str = ".bdb";

/// Database config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// When component folders are rescanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCaching {
    /// Rescan on every access; always fresh
    Always,
    /// Scan on first access per entity; stale until invalidated
    #[default]
    Once,
}

impl fmt::Display for ComponentCaching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentCaching::Always => write!(f, "always"),
            ComponentCaching::Once => write!(f, "once"),
        }
    }
}

impl FromStr for ComponentCaching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(ComponentCaching::Always),
            "once" => Ok(ComponentCaching::Once),
            _ => Err(format!("Unknown component caching: {}", s)),
        }
    }
}

/// Settings of one database, immutable once the database is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Database name, used to look up base paths in the system config
    pub name: String,

    /// Depth below the root at which entity folders live (0 = direct children)
    pub path_depth: usize,

    /// Alternative spellings of the root (drive letters, mounts, URI schemes)
    pub known_bases: Vec<String>,

    /// File and folder names to skip everywhere (sync artifacts)
    pub ignored_files: Vec<String>,

    /// Component folder caching policy
    pub component_caching: ComponentCaching,

    /// Known entity types
    pub buid_types: TypeTable,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            name: "barely-db".to_string(),
            path_depth: 1,
            known_bases: vec!["barelydb://".to_string(), "barely-db://".to_string()],
            ignored_files: vec!["desktop.ini".to_string()],
            component_caching: ComponentCaching::Once,
            buid_types: TypeTable::default(),
        }
    }
}

impl DbConfig {
    /// Path of the config file for a database rooted at `root`
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the config of the database at `root`
    ///
    /// A missing file yields the defaults. `BDB_PATH_DEPTH` overrides the
    /// scan depth.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Self::from_yaml(&contents, &path.display().to_string())?
        } else {
            tracing::debug!(path = %path.display(), "no database config, using defaults");
            Self::default()
        };

        if let Ok(depth) = std::env::var("BDB_PATH_DEPTH") {
            config.path_depth = depth
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "BDB_PATH_DEPTH".to_string(),
                    value: depth.clone(),
                })?;
        }

        Ok(config)
    }

    /// Parse a config document
    pub fn from_yaml(contents: &str, filename: &str) -> Result<Self, ConfigError> {
        serde_yml::from_str(contents)
            .map_err(|e| ConfigError::Syntax(SyntaxError::from_yaml(&e, contents, filename)))
    }

    /// Write the config into the database at `root`
    pub fn save(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::path(root);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let yaml = serde_yml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&path, yaml)?;
        Ok(path)
    }
}

/// Per-user settings: where databases live on this machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Database name -> candidate root paths, first existing wins
    pub default_base_path: BTreeMap<String, Vec<String>>,
}

impl SystemConfig {
    /// Load from `BDB_SYSTEM_CONFIG` or the user config directory
    ///
    /// An absent file yields an empty config.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        serde_yml::from_str(&contents).map_err(|e| {
            ConfigError::Syntax(SyntaxError::from_yaml(&e, &contents, &path.display().to_string()))
        })
    }

    /// Write to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let yaml = serde_yml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Location of the system config file
    pub fn path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BDB_SYSTEM_CONFIG") {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("", "", "bdb")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// First existing candidate root for the named database
    pub fn base_path(&self, name: &str) -> Option<PathBuf> {
        self.default_base_path
            .get(name)?
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_dir())
    }

    /// First existing candidate root of any configured database
    pub fn any_base_path(&self) -> Option<PathBuf> {
        self.default_base_path
            .keys()
            .find_map(|name| self.base_path(name))
    }
}

/// Errors loading or saving configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
