//! Core module - identifiers, indexing and storage

pub mod alias;
pub mod config;
pub mod database;
pub mod entity;
pub mod files;
pub mod identity;
pub mod index;
pub mod parser;
pub mod properties;
pub mod revision;
pub mod serialize;
pub mod shell;

pub use alias::{PathResolver, ResolveError};
pub use config::{ComponentCaching, ConfigError, DbConfig, SystemConfig};
pub use database::{Database, DatabaseError};
pub use entity::EntityHandle;
pub use identity::{Buid, IdParseError, TypeTable};
pub use index::{DirectoryIndex, IndexError, ScanStats};
pub use parser::{BuidParser, ParseDiagnostic, ParseMode, ParseOutcome, Parsed, ParserOptions, UnknownTypes};
pub use properties::{PropertyError, PropertyStore};
pub use revision::WriteOutcome;
pub use serialize::{FileBinding, JsonSerializer, SerializeError, Serializer, YamlSerializer};
pub use shell::{PathOpener, SystemOpener};
