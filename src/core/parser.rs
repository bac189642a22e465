//! Identifier grammar: extraction of BUIDs from free text
//!
//! A [`BuidParser`] scans arbitrary text (folder names, file names, user
//! input) for every substring matching the identifier grammar and reduces
//! the matches according to its [`ParseMode`]. Problems such as ambiguous
//! or unknown identifiers never abort parsing; they are reported as
//! [`ParseDiagnostic`] values next to the result.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

use crate::core::identity::{Buid, IdParseError, TypeTable};

lazy_static! {
    static ref BASE_GRAMMAR: Regex = Regex::new(r"([a-zA-Z]{2,3})(\d{2,5})").unwrap();
    static ref COMPONENT_GRAMMAR: Regex =
        Regex::new(r"([a-zA-Z]{2,3})(\d{2,5})-?([a-zA-Z]{1,2}\d{1,5})?").unwrap();
    static ref COMPONENT_REQUIRED_GRAMMAR: Regex =
        Regex::new(r"([a-zA-Z]{2,3})(\d{2,5})-([a-zA-Z]{1,2}\d{1,5})").unwrap();
}

/// How the list of matches is reduced to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Every match, in order, duplicates retained
    All,
    /// Every match, first occurrence order, duplicates removed
    AllUnique,
    /// First match
    First,
    /// Last match
    Last,
    /// Exactly one distinct match, otherwise nothing
    #[default]
    Unique,
}

impl ParseMode {
    /// Whether this mode yields a single value rather than a list
    pub fn is_single(self) -> bool {
        matches!(self, ParseMode::First | ParseMode::Last | ParseMode::Unique)
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::All => write!(f, "all"),
            ParseMode::AllUnique => write!(f, "all-unique"),
            ParseMode::First => write!(f, "first"),
            ParseMode::Last => write!(f, "last"),
            ParseMode::Unique => write!(f, "unique"),
        }
    }
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(ParseMode::All),
            "all-unique" => Ok(ParseMode::AllUnique),
            "first" => Ok(ParseMode::First),
            "last" => Ok(ParseMode::Last),
            "unique" => Ok(ParseMode::Unique),
            _ => Err(format!("Unknown parse mode: {}", s)),
        }
    }
}

/// Treatment of matches whose type code is not in the type table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypes {
    /// Drop them silently
    Ignore,
    /// Keep them and report a diagnostic
    #[default]
    Warn,
    /// Keep them silently
    Accept,
}

impl fmt::Display for UnknownTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownTypes::Ignore => write!(f, "ignore"),
            UnknownTypes::Warn => write!(f, "warn"),
            UnknownTypes::Accept => write!(f, "accept"),
        }
    }
}

impl FromStr for UnknownTypes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(UnknownTypes::Ignore),
            "warn" => Ok(UnknownTypes::Warn),
            "accept" => Ok(UnknownTypes::Accept),
            _ => Err(format!("Unknown type handling: {}", s)),
        }
    }
}

/// Parser settings, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub mode: ParseMode,
    pub unknown: UnknownTypes,
    pub warn_empty: bool,
    pub allow_components: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            mode: ParseMode::Unique,
            unknown: UnknownTypes::Warn,
            warn_empty: true,
            allow_components: true,
        }
    }
}

impl ParserOptions {
    pub fn mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn unknown(mut self, unknown: UnknownTypes) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn warn_empty(mut self, warn_empty: bool) -> Self {
        self.warn_empty = warn_empty;
        self
    }

    pub fn allow_components(mut self, allow_components: bool) -> Self {
        self.allow_components = allow_components;
        self
    }
}

/// Something noteworthy that happened while parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDiagnostic {
    #[error("no valid identifier found in '{text}'")]
    Empty { text: String },

    #[error("more than one valid identifier found in '{text}' ({})", candidates.join(", "))]
    Ambiguous {
        text: String,
        candidates: Vec<String>,
    },

    #[error("unknown identifier type {type_code} in '{text}'")]
    UnknownType { text: String, type_code: String },

    #[error("no component found in '{text}' when one was requested")]
    MissingComponent { text: String },
}

/// Result shape of a parse: a single value or a list, depending on the mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    None,
    One(T),
    Many(Vec<T>),
}

/// A parse result together with the diagnostics raised while producing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome<T> {
    pub value: Parsed<T>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl<T> ParseOutcome<T> {
    /// The single value of a single-valued mode (first element otherwise)
    pub fn one(self) -> Option<T> {
        match self.value {
            Parsed::None => None,
            Parsed::One(v) => Some(v),
            Parsed::Many(v) => v.into_iter().next(),
        }
    }

    /// All values as a list
    pub fn into_vec(self) -> Vec<T> {
        match self.value {
            Parsed::None => Vec::new(),
            Parsed::One(v) => vec![v],
            Parsed::Many(v) => v,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.value, Parsed::None)
    }

    /// Forward the diagnostics to the log and hand the outcome back
    pub fn logged(self) -> Self {
        for diagnostic in &self.diagnostics {
            tracing::warn!("{}", diagnostic);
        }
        self
    }
}

/// One raw regex hit
struct RawMatch<'t> {
    type_code: &'t str,
    digits: &'t str,
    component: Option<&'t str>,
}

impl RawMatch<'_> {
    fn to_buid(&self) -> Buid {
        // The grammar bounds digits to 5, which always fits a u32
        let number = self.digits.parse::<u32>().unwrap_or_default();
        Buid::new(self.type_code, number, self.component)
    }
}

/// Extracts and normalizes identifiers from text
#[derive(Debug, Clone)]
pub struct BuidParser {
    types: TypeTable,
    options: ParserOptions,
}

impl BuidParser {
    pub fn new(types: TypeTable, options: ParserOptions) -> Self {
        Self { types, options }
    }

    /// A parser that only knows a subset of the type table
    ///
    /// Unknown types are then ignored unless explicitly accepted, which is
    /// rejected as contradictory.
    pub fn restricted<S: AsRef<str>>(
        types: &TypeTable,
        mut options: ParserOptions,
        allowed: &[S],
    ) -> Result<Self, IdParseError> {
        match options.unknown {
            UnknownTypes::Accept => return Err(IdParseError::ConflictingOptions),
            UnknownTypes::Warn => options.unknown = UnknownTypes::Ignore,
            UnknownTypes::Ignore => {}
        }
        Ok(Self {
            types: types.restricted(allowed),
            options,
        })
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Extract identifiers (with components unless disabled)
    pub fn parse(&self, text: &str) -> ParseOutcome<Buid> {
        let grammar = if self.options.allow_components {
            &*COMPONENT_GRAMMAR
        } else {
            &*BASE_GRAMMAR
        };
        let mut diagnostics = Vec::new();
        let found = self.find(text, grammar, &mut diagnostics);
        let items = found.iter().map(RawMatch::to_buid).collect();
        let value = self.reduce(text, items, &mut diagnostics);
        ParseOutcome { value, diagnostics }
    }

    /// Extract the component code of identifiers that carry one
    pub fn parse_component(&self, text: &str) -> ParseOutcome<String> {
        let mut diagnostics = Vec::new();
        let found = self.find(text, &COMPONENT_REQUIRED_GRAMMAR, &mut diagnostics);

        if found.is_empty() && self.options.warn_empty {
            diagnostics.push(ParseDiagnostic::MissingComponent {
                text: text.to_string(),
            });
            return ParseOutcome {
                value: self.empty_value(),
                diagnostics,
            };
        }

        let items = found
            .iter()
            .filter_map(|m| m.component.map(str::to_string))
            .collect();
        let value = self.reduce(text, items, &mut diagnostics);
        ParseOutcome { value, diagnostics }
    }

    /// Extract the (upper-cased) type codes of identifiers
    pub fn parse_type(&self, text: &str) -> ParseOutcome<String> {
        let mut diagnostics = Vec::new();
        let found = self.find(text, &BASE_GRAMMAR, &mut diagnostics);
        let items = found.iter().map(|m| m.type_code.to_uppercase()).collect();
        let value = self.reduce(text, items, &mut diagnostics);
        ParseOutcome { value, diagnostics }
    }

    /// Scan for grammar hits and apply the unknown-type policy
    fn find<'t>(
        &self,
        text: &'t str,
        grammar: &Regex,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Vec<RawMatch<'t>> {
        let mut found: Vec<RawMatch<'t>> = grammar
            .captures_iter(text)
            .filter_map(|caps| {
                Some(RawMatch {
                    type_code: caps.get(1)?.as_str(),
                    digits: caps.get(2)?.as_str(),
                    component: caps.get(3).map(|m| m.as_str()),
                })
            })
            .collect();

        match self.options.unknown {
            UnknownTypes::Ignore => found.retain(|m| self.types.is_known(m.type_code)),
            UnknownTypes::Warn => {
                let mut reported = HashSet::new();
                for m in &found {
                    let code = m.type_code.to_uppercase();
                    if !self.types.is_known(&code) && reported.insert(code.clone()) {
                        diagnostics.push(ParseDiagnostic::UnknownType {
                            text: text.to_string(),
                            type_code: code,
                        });
                    }
                }
            }
            UnknownTypes::Accept => {}
        }

        found
    }

    fn empty_value<T>(&self) -> Parsed<T> {
        if self.options.mode.is_single() {
            Parsed::None
        } else {
            Parsed::Many(Vec::new())
        }
    }

    /// Reduce the match list according to the mode
    fn reduce<T>(
        &self,
        text: &str,
        mut items: Vec<T>,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Parsed<T>
    where
        T: Clone + Eq + Hash + fmt::Display,
    {
        let mode = self.options.mode;

        if matches!(mode, ParseMode::AllUnique | ParseMode::Unique) {
            items = dedup_keep_order(items);
        }
        if mode == ParseMode::Last {
            items.reverse();
        }

        match mode {
            ParseMode::All | ParseMode::AllUnique => Parsed::Many(items),
            ParseMode::First | ParseMode::Last | ParseMode::Unique => {
                if items.is_empty() {
                    if self.options.warn_empty {
                        diagnostics.push(ParseDiagnostic::Empty {
                            text: text.to_string(),
                        });
                    }
                    return Parsed::None;
                }
                if mode == ParseMode::Unique && items.len() > 1 {
                    diagnostics.push(ParseDiagnostic::Ambiguous {
                        text: text.to_string(),
                        candidates: items.iter().map(|i| i.to_string()).collect(),
                    });
                    return Parsed::None;
                }
                items.into_iter().next().map_or(Parsed::None, Parsed::One)
            }
        }
    }
}

fn dedup_keep_order<T: Clone + Eq + Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
