//! Database discovery and the opened database

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::alias::{PathResolver, ResolveError};
use crate::core::config::{ConfigError, DbConfig, SystemConfig, CONFIG_DIR};
use crate::core::entity::EntityHandle;
use crate::core::files::{self, EntryKind};
use crate::core::identity::Buid;
use crate::core::index::{DirectoryIndex, IndexError, ScanStats};

/// An opened database: its settings, alias resolver and loaded index
#[derive(Debug)]
pub struct Database {
    root: PathBuf,
    config: DbConfig,
    resolver: PathResolver,
    index: DirectoryIndex,
    stats: ScanStats,
}

impl Database {
    /// Find a database root by walking up from `start`
    pub fn discover_from(start: &Path) -> Result<PathBuf, DatabaseError> {
        let mut current = start.canonicalize()?;

        loop {
            if current.join(CONFIG_DIR).is_dir() {
                return Ok(current);
            }
            if !current.pop() {
                return Err(DatabaseError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Pick the database root
    ///
    /// Order: `explicit`, `BDB_ROOT`, the nearest ancestor of the working
    /// directory holding `.bdb/`, then the system config's base paths.
    pub fn locate_root(explicit: Option<&Path>) -> Result<PathBuf, DatabaseError> {
        if let Some(root) = explicit {
            return Ok(root.to_path_buf());
        }
        if let Ok(root) = std::env::var("BDB_ROOT") {
            if !root.is_empty() {
                return Ok(PathBuf::from(root));
            }
        }

        let cwd = std::env::current_dir()?;
        match Self::discover_from(&cwd) {
            Ok(root) => Ok(root),
            Err(DatabaseError::NotFound { searched_from }) => {
                let system = SystemConfig::load()?;
                system
                    .any_base_path()
                    .ok_or(DatabaseError::NotFound { searched_from })
            }
            Err(e) => Err(e),
        }
    }

    /// Create the marker directory and config of a new database
    pub fn init(path: &Path, config: &DbConfig, force: bool) -> Result<PathBuf, DatabaseError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(CONFIG_DIR).exists() && !force {
            return Err(DatabaseError::AlreadyExists(root));
        }

        std::fs::create_dir_all(&root)?;
        let config_path = config.save(&root)?;
        tracing::info!(path = %config_path.display(), "database initialized");
        Ok(root)
    }

    /// Open the database at `root` and scan its entities
    pub fn open(root: &Path) -> Result<Self, DatabaseError> {
        if !root.is_dir() {
            return Err(DatabaseError::RootMissing(root.to_path_buf()));
        }
        let root = root.canonicalize()?;
        let config = DbConfig::load(&root)?;
        Self::with_config(&root, config)
    }

    /// Open with an explicit config instead of the one stored in the tree
    pub fn with_config(root: &Path, config: DbConfig) -> Result<Self, DatabaseError> {
        let resolver = PathResolver::new(root, config.known_bases.as_slice())?;
        let mut index = DirectoryIndex::new(root, &config);
        let stats = index.load_entities()?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
            resolver,
            index,
            stats,
        })
    }

    /// Locate and open in one step
    pub fn open_auto(explicit: Option<&Path>) -> Result<Self, DatabaseError> {
        let root = Self::locate_root(explicit)?;
        Self::open(&root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn index(&self) -> &DirectoryIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut DirectoryIndex {
        &mut self.index
    }

    /// Statistics of the most recent scan
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Rescan the tree
    pub fn reload(&mut self) -> Result<&ScanStats, DatabaseError> {
        self.stats = self.index.load_entities()?;
        Ok(&self.stats)
    }

    /// Handle for an identifier given as free text (`wb251-d2`, a folder name, ...)
    ///
    /// Fails when the text does not name exactly one entity of the index.
    pub fn entity(&self, text: &str) -> Result<EntityHandle<'_>, DatabaseError> {
        let buid = self.index.normalize(text)?;
        self.index.entity_path(&buid)?;
        Ok(EntityHandle::new(&self.index, buid))
    }

    /// Handle for the entity owning a path inside the tree
    pub fn entity_for_path(&self, raw: &str) -> Result<EntityHandle<'_>, DatabaseError> {
        let absolute = self.resolver.resolve_path(raw);
        let owner = self
            .index
            .entity_paths()
            .iter()
            .filter(|(_, dir)| absolute.starts_with(dir))
            .max_by_key(|(_, dir)| dir.components().count())
            .map(|(buid, dir)| (buid.clone(), dir.clone()));

        let (buid, dir) = owner.ok_or_else(|| IndexError::NotFound(raw.to_string()))?;

        // Narrow to the component folder the path sits in, if any
        let components = self.index.component_paths(&buid)?;
        let buid = components
            .iter()
            .find(|(_, comp_dir)| absolute.starts_with(comp_dir))
            .map(|(code, _)| buid.with_component(code))
            .unwrap_or(buid);

        tracing::debug!(path = %absolute.display(), entity = %dir.display(), %buid, "path mapped to entity");
        Ok(EntityHandle::new(&self.index, buid))
    }

    /// Files matching `glob` in every entity folder and component folder
    pub fn discover_files(&self, glob: &str) -> Result<Vec<(Buid, PathBuf)>, DatabaseError> {
        let ignored = self.index.ignored_files();
        let mut found = Vec::new();

        for (buid, dir) in self.index.entity_paths() {
            for path in files::list(dir, glob, EntryKind::Files, ignored)? {
                found.push((buid.clone(), path));
            }
            for (code, comp_dir) in self.index.component_paths(buid)? {
                for path in files::list(&comp_dir, glob, EntryKind::Files, ignored)? {
                    found.push((buid.with_component(&code), path));
                }
            }
        }

        Ok(found)
    }
}

/// Errors locating or opening a database
#[derive(Debug, Error, miette::Diagnostic)]
pub enum DatabaseError {
    #[error("not a barely-db database (searched from {searched_from:?})")]
    #[diagnostic(help("run 'bdb init' at the database root, pass --root or set BDB_ROOT"))]
    NotFound { searched_from: PathBuf },

    #[error("database already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("database root does not exist: {0:?}")]
    RootMissing(PathBuf),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> TempDir {
        let tmp = tempdir().unwrap();
        Database::init(tmp.path(), &DbConfig::default(), false).unwrap();
        for dir in [
            "Webs/WB0251_coated/-D1",
            "Webs/WB0252_uncoated",
            "Slurries/SL0001_mix",
        ] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        fs::write(tmp.path().join("Webs/WB0251_coated/recipe.yaml"), "a: 1").unwrap();
        fs::write(tmp.path().join("Webs/WB0251_coated/-D1/recipe.yaml"), "a: 2").unwrap();
        fs::write(tmp.path().join("Webs/WB0252_uncoated/recipe.yaml"), "a: 3").unwrap();
        tmp
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = fixture();
        let err = Database::init(tmp.path(), &DbConfig::default(), false).unwrap_err();
        assert!(matches!(err, DatabaseError::AlreadyExists(_)));
        assert!(Database::init(tmp.path(), &DbConfig::default(), true).is_ok());
    }

    #[test]
    fn test_discover_from_nested_dir() {
        let tmp = fixture();
        let nested = tmp.path().join("Webs/WB0251_coated/-D1");
        let root = Database::discover_from(&nested).unwrap();
        assert_eq!(root, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            Database::discover_from(tmp.path()).unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }

    #[test]
    fn test_open_and_lookup() {
        let tmp = fixture();
        let db = Database::open(tmp.path()).unwrap();

        assert_eq!(db.stats().entities_found, 3);
        let entity = db.entity("wb251-D1").unwrap();
        assert_eq!(entity.buid_with_component().to_string(), "WB0251-D1");
        assert!(entity.path().unwrap().ends_with("WB0251_coated/-D1"));

        assert!(matches!(
            db.entity("WB0999").unwrap_err(),
            DatabaseError::Index(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_missing_root() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            Database::open(&tmp.path().join("nope")).unwrap_err(),
            DatabaseError::RootMissing(_)
        ));
    }

    #[test]
    fn test_entity_for_path() {
        let tmp = fixture();
        let db = Database::open(tmp.path()).unwrap();
        let root = db.root().display().to_string();

        let handle = db
            .entity_for_path(&format!("{}/Webs/WB0251_coated/-D1/recipe.yaml", root))
            .unwrap();
        assert_eq!(handle.buid_with_component().to_string(), "WB0251-D1");

        let handle = db
            .entity_for_path(&format!("{}/Webs/WB0252_uncoated", root))
            .unwrap();
        assert_eq!(handle.to_string(), "WB0252");

        assert!(db.entity_for_path(&format!("{}/Webs", root)).is_err());
    }

    #[test]
    fn test_discover_files() {
        let tmp = fixture();
        let db = Database::open(tmp.path()).unwrap();

        let found: Vec<String> = db
            .discover_files("recipe.yaml")
            .unwrap()
            .into_iter()
            .map(|(buid, _)| buid.to_string())
            .collect();
        assert_eq!(found, ["WB0251", "WB0251-D1", "WB0252"]);
    }
}
