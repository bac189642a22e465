//! Rich diagnostics for malformed YAML and JSON payloads

pub mod diagnostics;

pub use diagnostics::SyntaxError;
