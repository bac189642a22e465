//! Property files: small JSON documents of measured values per entity
//!
//! Each `*.property.json` in an entity folder is one source of named
//! values. A query for a name must resolve to exactly one source; an
//! explicit preference list narrows ties, nothing is ever guessed.

use miette::Diagnostic;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use thiserror::Error;

use crate::core::entity::EntityHandle;
use crate::core::identity::Buid;
use crate::core::index::IndexError;
use crate::yaml::SyntaxError;

/// File name pattern of property files
pub const PROPERTY_GLOB: &str = "*.property.json";

/// Recorded when a property file does not name its identifier
pub const UNKNOWN_BUID: &str = "XX9999";

/// Recorded when a property file does not name its source
pub const UNKNOWN_SOURCE: &str = "Unknown source!";

/// One loaded property file
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFile {
    /// File name inside the entity folder
    pub file: String,
    /// Identifier the file claims to describe, [`UNKNOWN_BUID`] if absent
    pub buid: String,
    /// Where the values came from (instrument, operator, script), [`UNKNOWN_SOURCE`] if absent
    pub source: String,
    pub values: Map<String, Value>,
}

impl PropertyFile {
    /// Parse a property document, defaulting and reporting missing metadata
    pub fn parse(file: &str, text: &str) -> Result<Self, PropertyError> {
        let mut values: Map<String, Value> =
            serde_json::from_str(text).map_err(|e| SyntaxError::from_json(&e, text, file))?;

        let buid = take_string(&mut values, "buid").unwrap_or_else(|| {
            tracing::warn!(file, "property file has no buid specification");
            UNKNOWN_BUID.to_string()
        });
        let source = take_string(&mut values, "source").unwrap_or_else(|| {
            tracing::warn!(file, "property file has no source specification");
            UNKNOWN_SOURCE.to_string()
        });

        Ok(Self {
            file: file.to_string(),
            buid,
            source,
            values,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

fn take_string(values: &mut Map<String, Value>, key: &str) -> Option<String> {
    match values.remove(key)? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// The single answer to a property query
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMatch {
    pub value: Value,
    pub file: String,
    pub source: String,
}

/// Per-entity cache of property files
#[derive(Debug, Default)]
pub struct PropertyStore {
    cache: RefCell<HashMap<Buid, BTreeMap<String, PropertyFile>>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all property files of `entity` from disk
    pub fn load(&self, entity: &EntityHandle<'_>) -> Result<BTreeMap<String, PropertyFile>, PropertyError> {
        let mut files = BTreeMap::new();
        for path in entity.files(PROPERTY_GLOB)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let text = fs::read_to_string(&path)?;
            files.insert(name.clone(), PropertyFile::parse(&name, &text)?);
        }

        tracing::debug!(buid = %entity, files = files.len(), "property files loaded");
        self.cache
            .borrow_mut()
            .insert(entity.buid_with_component().clone(), files.clone());
        Ok(files)
    }

    /// Property files of `entity`, loading them on first access
    pub fn properties(&self, entity: &EntityHandle<'_>) -> Result<BTreeMap<String, PropertyFile>, PropertyError> {
        if let Some(files) = self.cache.borrow().get(entity.buid_with_component()) {
            return Ok(files.clone());
        }
        self.load(entity)
    }

    /// Drop cached files of one entity, or all
    pub fn invalidate(&self, id: Option<&Buid>) {
        match id {
            Some(id) => {
                self.cache.borrow_mut().remove(id);
            }
            None => self.cache.borrow_mut().clear(),
        }
    }

    /// Look up `name` across the entity's property files
    ///
    /// When several files carry the name, only those listed in `preferred`
    /// are kept; the query fails unless exactly one remains.
    pub fn query(
        &self,
        entity: &EntityHandle<'_>,
        name: &str,
        preferred: &[String],
    ) -> Result<PropertyMatch, PropertyError> {
        let files = self.properties(entity)?;
        let mut hits: Vec<&PropertyFile> = files.values().filter(|f| f.get(name).is_some()).collect();

        if hits.len() > 1 && !preferred.is_empty() {
            let narrowed: Vec<&PropertyFile> = hits
                .iter()
                .copied()
                .filter(|f| preferred.iter().any(|p| p == &f.file))
                .collect();
            if !narrowed.is_empty() {
                hits = narrowed;
            }
        }

        match hits.as_slice() {
            [] => Err(PropertyError::NotFound {
                buid: entity.to_string(),
                name: name.to_string(),
            }),
            [single] => Ok(PropertyMatch {
                value: single.get(name).cloned().unwrap_or(Value::Null),
                file: single.file.clone(),
                source: single.source.clone(),
            }),
            many => {
                let candidates: Vec<String> = many.iter().map(|f| f.file.clone()).collect();
                tracing::warn!(buid = %entity, name, candidates = ?candidates, "property defined in several files");
                Err(PropertyError::Ambiguous {
                    buid: entity.to_string(),
                    name: name.to_string(),
                    candidates,
                })
            }
        }
    }
}

/// Errors reading or querying property files
#[derive(Debug, Error, Diagnostic)]
pub enum PropertyError {
    #[error("property '{name}' not found for {buid}")]
    NotFound { buid: String, name: String },

    #[error("property '{name}' of {buid} is defined in several files: {}", candidates.join(", "))]
    #[diagnostic(help("pass one of the files as a preferred source"))]
    Ambiguous {
        buid: String,
        name: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Malformed(#[from] SyntaxError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
