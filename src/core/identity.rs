//! Entity identity system using typed, zero-padded BUIDs

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use miette::Diagnostic;
use thiserror::Error;

/// Largest numeric part a formatted identifier may carry
pub const MAX_NUMBER: u32 = 9999;

lazy_static! {
    static ref BUID_EXACT: Regex =
        Regex::new(r"^([a-zA-Z]{2,3})(\d{2,5})(?:-([a-zA-Z]{1,2}\d{1,5}))?$").unwrap();
    static ref TYPE_CODE: Regex = Regex::new(r"^[a-zA-Z]{2,3}$").unwrap();
}

/// A unique entity identifier: type code, numeric id and optional component
///
/// Formats as `TT####[-CC#]`. The type code is always upper case and the
/// number is zero-padded to four digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Buid {
    type_code: String,
    number: u32,
    component: Option<String>,
}

impl Buid {
    /// Create an identifier from its parts, normalizing the type code
    pub fn new(type_code: &str, number: u32, component: Option<&str>) -> Self {
        Self {
            type_code: type_code.to_uppercase(),
            number,
            component: component.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    /// Parse an identifier that must match the grammar exactly
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// Get the type code (e.g. "WB")
    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    /// Get the numeric part
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Get the component code, if any
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// The identifier of the owning entity (component stripped)
    pub fn base(&self) -> Buid {
        Self {
            type_code: self.type_code.clone(),
            number: self.number,
            component: None,
        }
    }

    /// Same entity, pointing at the given component
    pub fn with_component(&self, component: &str) -> Buid {
        Self {
            type_code: self.type_code.clone(),
            number: self.number,
            component: Some(component.to_string()),
        }
    }

    /// Same type with another number; fails beyond the 4-digit range
    pub fn with_number(&self, number: u32) -> Result<Buid, IdParseError> {
        if number > MAX_NUMBER {
            return Err(IdParseError::Exhausted {
                type_code: self.type_code.clone(),
                number,
            });
        }
        Ok(Self {
            type_code: self.type_code.clone(),
            number,
            component: None,
        })
    }

    /// Whether this identifier carries a component suffix
    pub fn is_component(&self) -> bool {
        self.component.is_some()
    }
}

impl fmt::Display for Buid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.type_code, self.number)?;
        if let Some(component) = &self.component {
            write!(f, "-{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for Buid {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = BUID_EXACT
            .captures(s.trim())
            .ok_or_else(|| IdParseError::InvalidFormat(s.to_string()))?;

        let number = caps[2]
            .parse::<u32>()
            .map_err(|_| IdParseError::InvalidFormat(s.to_string()))?;

        Ok(Buid::new(
            &caps[1],
            number,
            caps.get(3).map(|m| m.as_str()),
        ))
    }
}

impl Serialize for Buid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Buid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Mapping from human-readable type names to 2-3 letter type codes
///
/// Configured once per database and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct TypeTable {
    types: BTreeMap<String, String>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::from_pairs([
            ("slurry", "SL"),
            ("web", "WB"),
            ("cells", "CL"),
            ("electrochemistry", "EE"),
            ("rawmaterial", "RM"),
            ("experiment", "EXP"),
            ("equipment", "EQ"),
            ("manufacturing_orders", "MO"),
            ("product", "PD"),
            ("documents", "DOC"),
        ])
    }
}

impl From<BTreeMap<String, String>> for TypeTable {
    fn from(types: BTreeMap<String, String>) -> Self {
        Self::from_pairs(types.iter().map(|(n, c)| (n.as_str(), c.as_str())))
    }
}

impl From<TypeTable> for BTreeMap<String, String> {
    fn from(table: TypeTable) -> Self {
        table.types
    }
}

impl TypeTable {
    /// Build a table from (name, code) pairs; codes are upper-cased
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            types: pairs
                .into_iter()
                .map(|(name, code)| (name.to_string(), code.to_uppercase()))
                .collect(),
        }
    }

    /// Check a type code against the table (case-insensitive)
    pub fn is_known(&self, code: &str) -> bool {
        let upper = code.to_uppercase();
        self.types.values().any(|c| *c == upper)
    }

    /// Resolve a type name or a type code to the code
    pub fn code_for(&self, name_or_code: &str) -> Option<&str> {
        let lower = name_or_code.to_lowercase();
        if let Some(code) = self.types.get(&lower) {
            return Some(code.as_str());
        }
        if !looks_like_type_code(name_or_code) {
            return None;
        }
        let upper = name_or_code.to_uppercase();
        self.types
            .values()
            .find(|c| **c == upper)
            .map(String::as_str)
    }

    /// Reverse lookup of the human-readable name
    pub fn name_for(&self, code: &str) -> Option<&str> {
        let upper = code.to_uppercase();
        self.types
            .iter()
            .find(|(_, c)| **c == upper)
            .map(|(name, _)| name.as_str())
    }

    /// All known codes
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.types.values().map(String::as_str)
    }

    /// All (name, code) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.types.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    /// A copy of this table restricted to the given codes
    pub fn restricted<S: AsRef<str>>(&self, allowed: &[S]) -> Self {
        let allowed: Vec<String> = allowed.iter().map(|a| a.as_ref().to_uppercase()).collect();
        Self {
            types: self
                .types
                .iter()
                .filter(|(_, code)| allowed.contains(code))
                .map(|(n, c)| (n.clone(), c.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Check whether a string has the shape of a type code (2-3 letters)
pub fn looks_like_type_code(s: &str) -> bool {
    TYPE_CODE.is_match(s)
}

/// Errors that can occur when parsing or deriving identifiers
#[derive(Debug, Error, Diagnostic)]
pub enum IdParseError {
    #[error("invalid identifier: '{0}' (expected e.g. WB0251 or WB0251-D2)")]
    InvalidFormat(String),

    #[error("unknown entity type: '{0}'")]
    UnknownType(String),

    #[error("identifier range exhausted for type {type_code}: {number} exceeds 9999")]
    Exhausted { type_code: String, number: u32 },

    #[error("unknown types cannot be accepted when the allowed types are restricted")]
    ConflictingOptions,
}
