//! Directory index: identifier -> folder map built by scanning the tree
//!
//! Entity folders sit at a fixed depth below the root and carry their
//! identifier in the name (`Webs/WB0251_coated`). Component folders are
//! the direct children of an entity folder named `-<CODE>[free text]`.
//! The index owns the identifier -> path map; nothing here notices
//! external changes until [`DirectoryIndex::load_entities`] runs again.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use miette::Diagnostic;
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::config::{ComponentCaching, DbConfig};
use crate::core::files::regularize_filename;
use crate::core::identity::{Buid, IdParseError, TypeTable, MAX_NUMBER};
use crate::core::parser::{BuidParser, ParseMode, ParserOptions, UnknownTypes};

/// Summary of one full scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub directories_scanned: usize,
    pub entities_found: usize,
    pub duplicates: usize,
    pub inconsistent_types: usize,
    pub duration_ms: u64,
}

/// Identifier -> folder index over one database root
#[derive(Debug)]
pub struct DirectoryIndex {
    root: PathBuf,
    path_depth: usize,
    ignored_files: Vec<String>,
    caching: ComponentCaching,
    types: TypeTable,
    entity_paths: BTreeMap<Buid, PathBuf>,
    type_parents: BTreeMap<String, PathBuf>,
    components: RefCell<HashMap<Buid, BTreeMap<String, PathBuf>>>,
    folder_parser: BuidParser,
    component_parser: BuidParser,
    lookup_parser: BuidParser,
}

impl DirectoryIndex {
    /// Create an empty index; call [`load_entities`](Self::load_entities) to fill it
    pub fn new(root: &Path, config: &DbConfig) -> Self {
        let types = config.buid_types.clone();

        let folder_parser = BuidParser::new(
            types.clone(),
            ParserOptions::default()
                .mode(ParseMode::First)
                .unknown(UnknownTypes::Ignore)
                .warn_empty(false)
                .allow_components(false),
        );
        let component_parser = BuidParser::new(
            types.clone(),
            ParserOptions::default()
                .mode(ParseMode::First)
                .unknown(UnknownTypes::Accept)
                .warn_empty(false),
        );
        let lookup_parser = BuidParser::new(
            types.clone(),
            ParserOptions::default()
                .mode(ParseMode::Unique)
                .unknown(UnknownTypes::Ignore),
        );

        Self {
            root: root.to_path_buf(),
            path_depth: config.path_depth,
            ignored_files: config.ignored_files.clone(),
            caching: config.component_caching,
            types,
            entity_paths: BTreeMap::new(),
            type_parents: BTreeMap::new(),
            components: RefCell::new(HashMap::new()),
            folder_parser,
            component_parser,
            lookup_parser,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn ignored_files(&self) -> &[String] {
        &self.ignored_files
    }

    fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignored_files.iter().any(|i| i.eq_ignore_ascii_case(name))
    }

    /// Rebuild the identifier -> path map from the filesystem
    pub fn load_entities(&mut self) -> Result<ScanStats, IndexError> {
        let start = std::time::Instant::now();
        let mut stats = ScanStats::default();
        let mut entity_paths = BTreeMap::new();
        let mut type_parents: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut warned_types = HashSet::new();

        let depth = self.path_depth + 1;
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir() && !self.is_ignored(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = entry?;
            if entry.depth() != depth {
                continue;
            }
            stats.directories_scanned += 1;

            let name = entry.file_name().to_string_lossy().to_string();
            let Some(buid) = self.folder_parser.parse(&name).one() else {
                continue;
            };
            let path = entry.into_path();

            if let Some(parent) = path.parent() {
                match type_parents.get(buid.type_code()) {
                    None => {
                        type_parents.insert(buid.type_code().to_string(), parent.to_path_buf());
                    }
                    Some(known) if known != parent => {
                        if warned_types.insert(buid.type_code().to_string()) {
                            stats.inconsistent_types += 1;
                            tracing::warn!(
                                type_code = buid.type_code(),
                                expected = %known.display(),
                                found = %parent.display(),
                                "entities of one type live under different parent directories"
                            );
                        }
                    }
                    Some(_) => {}
                }
            }

            if let Some(previous) = entity_paths.insert(buid.clone(), path.clone()) {
                stats.duplicates += 1;
                tracing::warn!(
                    buid = %buid,
                    previous = %previous.display(),
                    kept = %path.display(),
                    "duplicate entity folder"
                );
            }
        }

        stats.entities_found = entity_paths.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        self.entity_paths = entity_paths;
        self.type_parents = type_parents;
        self.components.borrow_mut().clear();

        tracing::info!(entities = stats.entities_found, root = %self.root.display(), "entities loaded");
        Ok(stats)
    }

    /// Normalize free text to one identifier (component kept, if present)
    pub fn normalize(&self, text: &str) -> Result<Buid, IndexError> {
        let outcome = self.lookup_parser.parse(text);
        let reason = outcome
            .diagnostics
            .first()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no identifier".to_string());
        outcome
            .one()
            .ok_or_else(|| IndexError::InvalidIdentifier {
                text: text.to_string(),
                reason,
            })
    }

    /// All indexed identifiers in order
    pub fn entities(&self) -> impl Iterator<Item = &Buid> {
        self.entity_paths.keys()
    }

    /// Identifiers of one type
    pub fn entities_of_type<'a>(&'a self, type_code: &'a str) -> impl Iterator<Item = &'a Buid> + 'a {
        self.entity_paths
            .keys()
            .filter(move |b| b.type_code().eq_ignore_ascii_case(type_code))
    }

    /// Full identifier -> path map
    pub fn entity_paths(&self) -> &BTreeMap<Buid, PathBuf> {
        &self.entity_paths
    }

    pub fn len(&self) -> usize {
        self.entity_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_paths.is_empty()
    }

    pub fn contains(&self, id: &Buid) -> bool {
        self.entity_paths.contains_key(&id.base())
    }

    /// Folder of an entity (any component suffix is ignored)
    pub fn entity_path(&self, id: &Buid) -> Result<&Path, IndexError> {
        self.entity_paths
            .get(&id.base())
            .map(PathBuf::as_path)
            .ok_or_else(|| IndexError::NotFound(id.base().to_string()))
    }

    /// Directory under which entities of a type are created
    pub fn parent_dir(&self, type_code: &str) -> Option<&Path> {
        self.type_parents
            .get(&type_code.to_uppercase())
            .map(PathBuf::as_path)
    }

    /// Component code -> folder for one entity
    pub fn component_paths(&self, id: &Buid) -> Result<BTreeMap<String, PathBuf>, IndexError> {
        let base = id.base();

        if self.caching == ComponentCaching::Once {
            if let Some(cached) = self.components.borrow().get(&base) {
                return Ok(cached.clone());
            }
        }

        let scanned = self.scan_components(&base)?;
        self.components.borrow_mut().insert(base, scanned.clone());
        Ok(scanned)
    }

    /// Folder of one component
    pub fn component_path(&self, id: &Buid, component: &str) -> Result<PathBuf, IndexError> {
        self.component_paths(id)?
            .into_iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(component))
            .map(|(_, path)| path)
            .ok_or_else(|| IndexError::ComponentNotFound {
                id: id.base().to_string(),
                component: component.to_string(),
            })
    }

    /// Forget cached components of one entity, or of all when `None`
    pub fn invalidate_components(&self, id: Option<&Buid>) {
        match id {
            Some(id) => {
                self.components.borrow_mut().remove(&id.base());
            }
            None => self.components.borrow_mut().clear(),
        }
    }

    fn scan_components(&self, base: &Buid) -> Result<BTreeMap<String, PathBuf>, IndexError> {
        let entity_path = self.entity_path(base)?;
        let mut found = BTreeMap::new();

        let mut entries = fs::read_dir(entity_path)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('-') || self.is_ignored(&name) || !entry.file_type()?.is_dir() {
                continue;
            }

            // Read the folder name as a suffix of the owning identifier
            let candidate = format!("{}{}", base, name);
            let Some(component) = self.component_parser.parse_component(&candidate).one() else {
                continue;
            };

            if let Some(previous) = found.insert(component.clone(), entry.path()) {
                tracing::warn!(
                    buid = %base,
                    component = %component,
                    previous = %previous.display(),
                    "duplicate component folder"
                );
            }
        }

        tracing::debug!(buid = %base, components = found.len(), "components scanned");
        Ok(found)
    }

    /// Find `count` identifiers at the start of a run of `lookahead` free numbers
    ///
    /// Searches upward from `start`'s number. Fails once the number range is
    /// exhausted.
    pub fn free_identifiers(
        &self,
        start: &Buid,
        count: usize,
        lookahead: usize,
    ) -> Result<Vec<Buid>, IndexError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let lookahead = lookahead.max(count);
        let available = (MAX_NUMBER as usize + 1).saturating_sub(start.number() as usize);
        if lookahead > available {
            return Err(IdParseError::Exhausted {
                type_code: start.type_code().to_string(),
                number: MAX_NUMBER + 1,
            }
            .into());
        }
        let mut run: Vec<Buid> = Vec::new();
        let mut number = start.number();

        loop {
            let candidate = start.with_number(number)?;
            if self.entity_paths.contains_key(&candidate) {
                run.clear();
            } else {
                run.push(candidate);
                if run.len() == lookahead {
                    run.truncate(count);
                    return Ok(run);
                }
            }
            number += 1;
        }
    }

    /// Resolve the target of a create call: a full identifier or a type
    fn creation_target(&self, id_or_type: &str) -> Result<Buid, IndexError> {
        if let Ok(id) = Buid::parse(id_or_type) {
            return Ok(id.base());
        }
        let code = self
            .types
            .code_for(id_or_type.trim())
            .ok_or_else(|| IdParseError::UnknownType(id_or_type.to_string()))?;
        let first = Buid::new(code, 1, None);
        let mut free = self.free_identifiers(&first, 1, 1)?;
        free.pop()
            .ok_or_else(|| IndexError::NotFound(first.to_string()))
    }

    /// Folder of an entity, creating `<ID>_<comment>` if it does not exist yet
    ///
    /// `id_or_type` is a full identifier or a type name/code; for a type the
    /// next free number is allocated. The folder is created non-recursively
    /// under the type's parent directory. With `rescan` the whole index is
    /// rebuilt afterwards, otherwise only the new entry is registered.
    pub fn create_entity_path(
        &mut self,
        id_or_type: &str,
        comment: &str,
        rescan: bool,
    ) -> Result<PathBuf, IndexError> {
        let id = self.creation_target(id_or_type)?;
        if let Some(existing) = self.entity_paths.get(&id) {
            return Ok(existing.clone());
        }

        let parent = self
            .parent_dir(id.type_code())
            .ok_or_else(|| IndexError::NoParentForType(id.type_code().to_string()))?
            .to_path_buf();

        let comment = regularize_filename(comment.trim());
        let name = if comment.is_empty() {
            id.to_string()
        } else {
            format!("{}_{}", id, comment)
        };
        let path = parent.join(name);
        fs::create_dir(&path)?;
        tracing::info!(buid = %id, path = %path.display(), "created entity folder");

        if rescan {
            self.load_entities()?;
            return Ok(self.entity_path(&id)?.to_path_buf());
        }
        self.entity_paths.insert(id, path.clone());
        Ok(path)
    }

    /// Folder of a component, creating `-<CODE>[_comment]` if missing
    pub fn create_component_path(
        &self,
        id: &Buid,
        component: &str,
        comment: &str,
    ) -> Result<PathBuf, IndexError> {
        let component = component.trim().trim_start_matches('-');
        let check = format!("{}-{}", id.base(), component);
        if self.component_parser.parse_component(&check).one().as_deref() != Some(component) {
            return Err(IndexError::InvalidIdentifier {
                text: check,
                reason: "not a valid component code".to_string(),
            });
        }

        if let Ok(existing) = self.component_path(id, component) {
            return Ok(existing);
        }

        let comment = regularize_filename(comment.trim());
        let name = if comment.is_empty() {
            format!("-{}", component)
        } else {
            format!("-{}_{}", component, comment)
        };
        let path = self.entity_path(id)?.join(name);
        fs::create_dir(&path)?;
        self.invalidate_components(Some(id));
        tracing::info!(buid = %id.base(), component, path = %path.display(), "created component folder");
        Ok(path)
    }
}

/// Errors raised by index lookups and updates
#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("component {component} not found for entity {id}")]
    ComponentNotFound { id: String, component: String },

    #[error("no parent directory known for type {0}; create one entity of this type manually first")]
    NoParentForType(String),

    #[error("cannot read an identifier from '{text}': {reason}")]
    InvalidIdentifier { text: String, reason: String },

    #[error(transparent)]
    Id(#[from] IdParseError),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
