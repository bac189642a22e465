//! Entity handles - views of one identifier bound to an index

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::files::{self, EntryKind};
use crate::core::identity::Buid;
use crate::core::index::{DirectoryIndex, IndexError};
use crate::core::shell::PathOpener;

/// One entity (optionally narrowed to a component) of a loaded index
///
/// The handle holds only the identifier; every path is looked up in the
/// index on demand, so a handle never caches a stale location.
#[derive(Clone)]
pub struct EntityHandle<'a> {
    index: &'a DirectoryIndex,
    buid: Buid,
}

impl<'a> EntityHandle<'a> {
    pub fn new(index: &'a DirectoryIndex, buid: Buid) -> Self {
        Self { index, buid }
    }

    /// The identifier of the owning entity, without component
    pub fn buid(&self) -> Buid {
        self.buid.base()
    }

    /// The identifier as given, component included
    pub fn buid_with_component(&self) -> &Buid {
        &self.buid
    }

    pub fn component(&self) -> Option<&str> {
        self.buid.component()
    }

    /// The owning entity of a component handle
    pub fn parent(&self) -> Option<EntityHandle<'a>> {
        self.is_component()
            .then(|| EntityHandle::new(self.index, self.buid.base()))
    }

    /// The same entity narrowed to one of its components
    pub fn with_component(&self, component: &str) -> EntityHandle<'a> {
        EntityHandle::new(self.index, self.buid.with_component(component))
    }

    pub fn index(&self) -> &'a DirectoryIndex {
        self.index
    }

    /// Folder of the owning entity
    pub fn entity_path(&self) -> Result<&'a Path, IndexError> {
        self.index.entity_path(&self.buid)
    }

    /// Folder of the component this handle points at
    pub fn component_path(&self) -> Result<Option<PathBuf>, IndexError> {
        match self.buid.component() {
            Some(component) => self.index.component_path(&self.buid, component).map(Some),
            None => Ok(None),
        }
    }

    /// Folder this handle points at: the component folder if it has one
    pub fn path(&self) -> Result<PathBuf, IndexError> {
        match self.component_path()? {
            Some(path) => Ok(path),
            None => Ok(self.entity_path()?.to_path_buf()),
        }
    }

    /// Whether the handle carries a component suffix
    pub fn is_component(&self) -> bool {
        self.buid.is_component()
    }

    /// Component code -> folder of the owning entity
    pub fn component_paths(&self) -> Result<BTreeMap<String, PathBuf>, IndexError> {
        self.index.component_paths(&self.buid)
    }

    /// Identifiers of all components of the owning entity
    pub fn components(&self) -> Result<Vec<Buid>, IndexError> {
        Ok(self
            .component_paths()?
            .into_keys()
            .map(|code| self.buid.with_component(&code))
            .collect())
    }

    /// Files directly inside the handle's folder matching `glob`
    pub fn files(&self, glob: &str) -> Result<Vec<PathBuf>, IndexError> {
        self.list(glob, EntryKind::Files)
    }

    /// Subdirectories of the handle's folder matching `glob`
    pub fn directories(&self, glob: &str) -> Result<Vec<PathBuf>, IndexError> {
        self.list(glob, EntryKind::Directories)
    }

    fn list(&self, glob: &str, kind: EntryKind) -> Result<Vec<PathBuf>, IndexError> {
        let dir = self.path()?;
        Ok(files::list(&dir, glob, kind, self.index.ignored_files())?)
    }

    /// Folder name without the identifier and separator (`WB0251_coated` -> `coated`)
    pub fn name(&self) -> Result<String, IndexError> {
        let path = self.path()?;
        let folder = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let prefix = match self.buid.component() {
            Some(component) => format!("-{}", component),
            None => self.buid.to_string(),
        };
        let rest = match folder.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(&prefix) => &folder[prefix.len()..],
            _ => folder.as_str(),
        };
        Ok(rest.trim_start_matches(['_', ' ', '-']).to_string())
    }

    /// Show the handle's folder in the file browser
    pub fn open(&self, opener: &dyn PathOpener) -> Result<(), IndexError> {
        opener.open_path(&self.path()?);
        Ok(())
    }
}

impl PartialEq for EntityHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.buid == other.buid
    }
}

impl Eq for EntityHandle<'_> {}

impl fmt::Debug for EntityHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("buid", &self.buid.to_string())
            .field("root", &self.index.root())
            .finish()
    }
}

impl fmt::Display for EntityHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.buid)
    }
}
