//! Binding stored objects to files inside entity folders
//!
//! A [`FileBinding`] knows how an object's file is named
//! (`[<BUID>_]<prefix><identifier><suffix>`) and saves payloads through
//! the revision store. The [`Serializer`] implementations turn typed values
//! into those payloads.

use miette::Diagnostic;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::EntityHandle;
use crate::core::files::regularize_filename;
use crate::core::index::IndexError;
use crate::core::revision::{self, WriteOutcome};
use crate::yaml::SyntaxError;

/// Identifier prefix accepted in front of prepended file names
const BUID_PREFIX: &str = r"[a-zA-Z]{2,3}\d{2,5}(?:-[a-zA-Z]{1,2}\d{1,5})?_";

/// Naming and storage policy for one kind of stored object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBinding {
    file_identifier: Option<String>,
    prefix: String,
    suffix: String,
    prepend_buid: bool,
    allow_parent: bool,
    keep_revisions: bool,
}

impl FileBinding {
    /// A binding with a fixed file identifier (e.g. `recipe.yaml`)
    pub fn fixed(file_identifier: &str) -> Self {
        Self {
            file_identifier: Some(file_identifier.to_string()),
            keep_revisions: true,
            ..Self::default()
        }
    }

    /// A binding whose identifier is supplied with every call
    pub fn per_call() -> Self {
        Self {
            keep_revisions: true,
            ..Self::default()
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    /// Start file names with `<BUID-with-component>_`
    pub fn prepend_buid(mut self, prepend: bool) -> Self {
        self.prepend_buid = prepend;
        self
    }

    /// Default for loads: fall back to the owning entity's file
    pub fn allow_parent(mut self, allow: bool) -> Self {
        self.allow_parent = allow;
        self
    }

    pub fn keep_revisions(mut self, keep: bool) -> Self {
        self.keep_revisions = keep;
        self
    }

    fn identifier<'s>(&'s self, file_identifier: Option<&'s str>) -> Result<&'s str, SerializeError> {
        file_identifier
            .or(self.file_identifier.as_deref())
            .ok_or(SerializeError::MissingIdentifier)
    }

    /// Bare file name for `entity`, without directory
    pub fn file_name(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
    ) -> Result<String, SerializeError> {
        let identifier = self.identifier(file_identifier)?;
        let mut name = String::new();
        if self.prepend_buid {
            name.push_str(&entity.buid_with_component().to_string());
            name.push('_');
        }
        name.push_str(&self.prefix);
        name.push_str(identifier);
        name.push_str(&self.suffix);

        let regular = regularize_filename(&name);
        if regular != name {
            tracing::info!(requested = %name, used = %regular, "removed invalid characters from file name");
        }
        Ok(regular)
    }

    /// Full path of the object's file for `entity`
    ///
    /// Rooted at the component folder when the handle carries a component.
    pub fn filename(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
    ) -> Result<PathBuf, SerializeError> {
        let name = self.file_name(entity, file_identifier)?;
        Ok(entity.path()?.join(name))
    }

    /// Write `bytes` as the object's file, keeping revisions if configured
    pub fn save(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        bytes: &[u8],
    ) -> Result<(PathBuf, WriteOutcome), SerializeError> {
        let path = self.filename(entity, file_identifier)?;
        let outcome = revision::write(&path, bytes, self.keep_revisions)?;
        tracing::info!(path = %path.display(), ?outcome, "object saved");
        Ok((path, outcome))
    }

    /// Where a load would read from, if the file exists anywhere
    pub fn locate(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
    ) -> Result<PathBuf, SerializeError> {
        let allow_parent = allow_parent.unwrap_or(self.allow_parent);

        let own = match self.filename(entity, file_identifier) {
            Ok(path) => Some(path),
            Err(SerializeError::Index(IndexError::ComponentNotFound { .. })) => None,
            Err(e) => return Err(e),
        };
        if let Some(path) = &own {
            if path.is_file() {
                return Ok(path.clone());
            }
        }

        if allow_parent {
            if let Some(parent) = entity.parent() {
                // The parent's file carries the parent's identifier when prepended
                let path = self.filename(&parent, file_identifier)?;
                if path.is_file() {
                    tracing::debug!(buid = %entity, path = %path.display(), "loading from parent entity");
                    return Ok(path);
                }
            }
        }

        Err(SerializeError::NotFound(
            own.map(|p| p.display().to_string())
                .unwrap_or_else(|| entity.to_string()),
        ))
    }

    /// Read the object's file; absent everywhere is [`SerializeError::NotFound`]
    pub fn load(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
    ) -> Result<(PathBuf, Vec<u8>), SerializeError> {
        let path = self.locate(entity, file_identifier, allow_parent)?;
        let bytes = fs::read(&path)?;
        Ok((path, bytes))
    }

    /// Like [`load`](Self::load) but substitutes `default` when the file is absent
    pub fn load_or(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
        default: Vec<u8>,
    ) -> Result<Vec<u8>, SerializeError> {
        match self.load(entity, file_identifier, allow_parent) {
            Ok((_, bytes)) => Ok(bytes),
            Err(SerializeError::NotFound(path)) => {
                tracing::info!(%path, "file not found, using default");
                Ok(default)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the object's file exists for `entity` (or its parent, if allowed)
    pub fn exists(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
    ) -> Result<bool, SerializeError> {
        match self.locate(entity, file_identifier, allow_parent) {
            Ok(_) => Ok(true),
            Err(SerializeError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `path` is named like a file of this binding
    ///
    /// Without a fixed or supplied identifier any identifier text matches.
    pub fn match_filename(&self, path: &Path, file_identifier: Option<&str>) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        let identifier = match file_identifier.or(self.file_identifier.as_deref()) {
            Some(id) => regex::escape(&regularize_filename(id)),
            None => ".+".to_string(),
        };
        let pattern = format!(
            "^{}{}{}{}$",
            if self.prepend_buid { BUID_PREFIX } else { "" },
            regex::escape(&regularize_filename(&self.prefix)),
            identifier,
            regex::escape(&regularize_filename(&self.suffix)),
        );

        Regex::new(&pattern)
            .map(|re| re.is_match(&name))
            .unwrap_or(false)
    }

    /// Serialize `value` and save it
    pub fn save_object<T: Serialize, S: Serializer>(
        &self,
        serializer: &S,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        value: &T,
    ) -> Result<PathBuf, SerializeError> {
        let bytes = serializer.serialize(value)?;
        let (path, _) = self.save(entity, file_identifier, &bytes)?;
        Ok(path)
    }

    /// Load and deserialize; malformed content is always an error
    pub fn load_object<T: DeserializeOwned + 'static, S: Serializer>(
        &self,
        serializer: &S,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
    ) -> Result<T, SerializeError> {
        let (path, bytes) = self.load(entity, file_identifier, allow_parent)?;
        serializer.deserialize(&bytes, &path.display().to_string())
    }

    /// Load and deserialize, or `default` when the file is absent
    pub fn load_object_or<T: DeserializeOwned + 'static, S: Serializer>(
        &self,
        serializer: &S,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
        allow_parent: Option<bool>,
        default: T,
    ) -> Result<T, SerializeError> {
        match self.load_object(serializer, entity, file_identifier, allow_parent) {
            Err(SerializeError::NotFound(_)) => Ok(default),
            other => other,
        }
    }

    /// Whether an object file exists for `entity`, under the binding's parent policy
    pub fn has_object(
        &self,
        entity: &EntityHandle<'_>,
        file_identifier: Option<&str>,
    ) -> Result<bool, SerializeError> {
        self.exists(entity, file_identifier, None)
    }
}

/// Turns typed values into stored payloads and back
pub trait Serializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerializeError>;

    /// `filename` is used for error reporting only
    fn deserialize<T: DeserializeOwned + 'static>(&self, bytes: &[u8], filename: &str) -> Result<T, SerializeError>;
}

fn as_text<'b>(bytes: &'b [u8], filename: &str) -> Result<&'b str, SerializeError> {
    std::str::from_utf8(bytes).map_err(|e| SerializeError::Encoding {
        filename: filename.to_string(),
        message: e.to_string(),
    })
}

/// YAML payloads via serde_yml
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerializeError> {
        serde_yml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| SerializeError::Encode(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned + 'static>(&self, bytes: &[u8], filename: &str) -> Result<T, SerializeError> {
        let text = as_text(bytes, filename)?;
        serde_yml::from_str(text).map_err(|e| SyntaxError::from_yaml(&e, text, filename).into())
    }
}

/// Pretty-printed JSON payloads via serde_json
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SerializeError> {
        serde_json::to_vec_pretty(value).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned + 'static>(&self, bytes: &[u8], filename: &str) -> Result<T, SerializeError> {
        let text = as_text(bytes, filename)?;
        serde_json::from_str(text).map_err(|e| SyntaxError::from_json(&e, text, filename).into())
    }
}

/// Errors saving or loading stored objects
#[derive(Debug, Error, Diagnostic)]
pub enum SerializeError {
    #[error("no file identifier given; fix one on the binding or pass one per call")]
    #[diagnostic(code(bdb::serialize::missing_identifier))]
    MissingIdentifier,

    #[error("file not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Malformed(#[from] SyntaxError),

    #[error("{filename} is not valid UTF-8: {message}")]
    Encoding { filename: String, message: String },

    #[error("failed to encode object: {0}")]
    Encode(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DbConfig;
    use crate::core::identity::Buid;
    use crate::core::index::DirectoryIndex;
    use serde::Deserialize;
    use tempfile::{tempdir, TempDir};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Recipe {
        a: String,
        b: u32,
    }

    fn recipe() -> Recipe {
        Recipe {
            a: "Hello".to_string(),
            b: 7,
        }
    }

    fn fixture() -> (TempDir, DirectoryIndex) {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("Webs/WB9001_test/-Y9")).unwrap();
        let mut index = DirectoryIndex::new(tmp.path(), &DbConfig::default());
        index.load_entities().unwrap();
        (tmp, index)
    }

    fn handle<'a>(index: &'a DirectoryIndex, id: &str) -> EntityHandle<'a> {
        EntityHandle::new(index, Buid::parse(id).unwrap())
    }

    #[test]
    fn test_filename_composition() {
        let (_tmp, index) = fixture();
        let entity = handle(&index, "WB9001-Y9");

        let binding = FileBinding::per_call().suffix(".UHHH.yaml");
        assert!(matches!(
            binding.file_name(&entity, None).unwrap_err(),
            SerializeError::MissingIdentifier
        ));
        assert_eq!(binding.file_name(&entity, Some("LALA")).unwrap(), "LALA.UHHH.yaml");

        let binding = FileBinding::fixed("some_data_X2.yaml");
        assert_eq!(binding.file_name(&entity, None).unwrap(), "some_data_X2.yaml");
        assert_eq!(binding.file_name(&entity, Some("MANA")).unwrap(), "MANA");

        let binding = FileBinding::fixed("some_data.yaml").prepend_buid(true);
        assert_eq!(
            binding.file_name(&entity, None).unwrap(),
            "WB9001-Y9_some_data.yaml"
        );

        let binding = FileBinding::per_call()
            .suffix(".some_data.yaml")
            .prepend_buid(true);
        assert_eq!(
            binding.file_name(&entity, Some("PALA")).unwrap(),
            "WB9001-Y9_PALA.some_data.yaml"
        );
    }

    #[test]
    fn test_filename_is_regularized_and_rooted() {
        let (tmp, index) = fixture();
        let binding = FileBinding::fixed("a:b?.yaml");

        let path = binding.filename(&handle(&index, "WB9001-Y9"), None).unwrap();
        assert_eq!(path, tmp.path().join("Webs/WB9001_test/-Y9/ab.yaml"));

        let path = binding.filename(&handle(&index, "WB9001"), None).unwrap();
        assert_eq!(path, tmp.path().join("Webs/WB9001_test/ab.yaml"));
    }

    #[test]
    fn test_match_filename() {
        let binding = FileBinding::per_call()
            .suffix(".some_data.yaml")
            .prepend_buid(true);
        let path = Path::new("/x/WB9001-Y9_PALA.some_data.yaml");
        assert!(binding.match_filename(path, None));
        assert!(binding.match_filename(path, Some("PALA")));
        assert!(!binding.match_filename(path, Some("LALA")));
        assert!(!binding.match_filename(Path::new("/x/PALA.some_data.yaml"), None));

        let binding = FileBinding::fixed("some_data_X2.yaml");
        assert!(binding.match_filename(Path::new("some_data_X2.yaml"), None));
        assert!(binding.match_filename(Path::new("MANA"), Some("MANA")));
        assert!(!binding.match_filename(Path::new("some_data_X2.yaml.1"), None));
    }

    #[test]
    fn test_save_and_load_object() {
        let (_tmp, index) = fixture();
        let entity = handle(&index, "WB9001-Y9");
        let binding = FileBinding::fixed("some_data_X5.yaml").prepend_buid(true);
        let other = FileBinding::fixed("some_data_X6.yaml").prepend_buid(true);

        let path = binding
            .save_object(&YamlSerializer, &entity, None, &recipe())
            .unwrap();
        assert!(path.ends_with("WB9001-Y9_some_data_X5.yaml"));
        assert!(binding.match_filename(&path, None));

        assert!(binding.has_object(&entity, None).unwrap());
        assert!(!other.has_object(&entity, None).unwrap());

        let loaded: Recipe = binding
            .load_object(&YamlSerializer, &entity, None, None)
            .unwrap();
        assert_eq!(loaded, recipe());
    }

    #[test]
    fn test_save_keeps_revisions() {
        let (_tmp, index) = fixture();
        let entity = handle(&index, "WB9001");
        let binding = FileBinding::fixed("recipe.json");

        let (path, outcome) = binding.save(&entity, None, b"{\"a\": 1}").unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        let (_, outcome) = binding.save(&entity, None, b"{\"a\": 1}").unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged);
        let (_, outcome) = binding.save(&entity, None, b"{\"a\": 2}").unwrap();
        assert_eq!(outcome, WriteOutcome::Revised { collapsed: false });
        assert!(revision::revision_path(&path, 1).exists());
    }

    #[test]
    fn test_component_inherits_parent_object() {
        let (_tmp, index) = fixture();
        let base = handle(&index, "WB9001");
        let component = handle(&index, "WB9001-Y9");
        let binding = FileBinding::fixed("recipe.yaml");

        binding
            .save_object(&YamlSerializer, &base, None, &recipe())
            .unwrap();

        let inherited: Recipe = binding
            .load_object(&YamlSerializer, &component, None, Some(true))
            .unwrap();
        assert_eq!(inherited, recipe());

        let err = binding
            .load_object::<Recipe, _>(&YamlSerializer, &component, None, Some(false))
            .unwrap_err();
        assert!(matches!(err, SerializeError::NotFound(_)));

        // Binding default applies when the call does not say
        let binding = binding.allow_parent(true);
        assert!(binding.has_object(&component, None).unwrap());
    }

    #[test]
    fn test_has_object_reports_lookup_errors() {
        let (_tmp, index) = fixture();
        let entity = handle(&index, "WB9001");

        let err = FileBinding::per_call().has_object(&entity, None).unwrap_err();
        assert!(matches!(err, SerializeError::MissingIdentifier));

        let unknown = handle(&index, "WB0042");
        let err = FileBinding::fixed("recipe.yaml")
            .has_object(&unknown, None)
            .unwrap_err();
        assert!(matches!(err, SerializeError::Index(IndexError::NotFound(_))));
    }

    #[test]
    fn test_missing_component_folder_falls_back_to_parent() {
        let (_tmp, index) = fixture();
        let base = handle(&index, "WB9001");
        let missing = handle(&index, "WB9001-Q1");
        let binding = FileBinding::fixed("recipe.yaml");

        binding.save(&base, None, b"a: x\nb: 1\n").unwrap();
        assert!(binding.load(&missing, None, Some(true)).is_ok());
        assert!(matches!(
            binding.load(&missing, None, Some(false)).unwrap_err(),
            SerializeError::NotFound(_)
        ));
    }

    #[test]
    fn test_malformed_payload_propagates() {
        let (_tmp, index) = fixture();
        let entity = handle(&index, "WB9001");
        let binding = FileBinding::fixed("recipe.yaml");
        binding.save(&entity, None, b"a: [unclosed\n").unwrap();

        let err = binding
            .load_object_or(&YamlSerializer, &entity, None, None, recipe())
            .unwrap_err();
        assert!(matches!(err, SerializeError::Malformed(_)));

        // Absent files do fall back to the default
        let other = FileBinding::fixed("other.yaml");
        let value = other
            .load_object_or(&YamlSerializer, &entity, None, None, recipe())
            .unwrap();
        assert_eq!(value, recipe());
        assert_eq!(
            other.load_or(&entity, None, None, b"x".to_vec()).unwrap(),
            b"x".to_vec()
        );
    }

    #[test]
    fn test_json_serializer() {
        let bytes = JsonSerializer.serialize(&recipe()).unwrap();
        let back: Recipe = JsonSerializer.deserialize(&bytes, "r.json").unwrap();
        assert_eq!(back, recipe());

        let err = JsonSerializer
            .deserialize::<Recipe>(b"{\"a\": ", "r.json")
            .unwrap_err();
        assert!(matches!(err, SerializeError::Malformed(_)));
    }
}
