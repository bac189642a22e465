//! Syntax errors in stored payloads, rendered with source spans

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A payload that could not be decoded, pointing at the offending location
#[derive(Debug, Error, Diagnostic)]
#[error("{format} syntax error in {filename}: {message}")]
#[diagnostic(code(bdb::payload::syntax))]
pub struct SyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    format: &'static str,
    filename: String,
    message: String,
}

impl SyntaxError {
    /// Build from a serde_yml error
    pub fn from_yaml(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));
        Self::at_location("YAML", err.to_string(), source, filename, line, column)
    }

    /// Build from a serde_json error
    pub fn from_json(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let line = err.line().max(1);
        let column = err.column().max(1);
        Self::at_location("JSON", err.to_string(), source, filename, line, column)
    }

    fn at_location(
        format: &'static str,
        message: String,
        source: &str,
        filename: &str,
        line: usize,
        column: usize,
    ) -> Self {
        let offset = line_col_to_offset(source, line, column);
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            format,
            filename: filename.to_string(),
            message,
        }
    }

    /// The decoder's own message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of the reported location
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

/// Convert a 1-based line/column pair to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            line_start = i + 1;
        }
    }
    if current_line < line {
        return source.len().saturating_sub(1);
    }

    let line_text = &source[line_start..];
    let line_len = line_text.find('\n').unwrap_or(line_text.len());
    line_text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(j, _)| line_start + j.min(line_len))
        .unwrap_or(line_start + line_len)
}

/// Suggestions for common hand-editing mistakes in stored objects
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("tab") {
        return Some("YAML requires spaces for indentation, not tabs.".to_string());
    }
    if msg_lower.contains("duplicate key") || msg_lower.contains("duplicate field") {
        return Some("Each key can only appear once. Remove or rename the duplicate.".to_string());
    }
    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }
    if msg_lower.contains("trailing comma") {
        return Some("JSON does not allow a comma after the last element.".to_string());
    }
    if msg_lower.contains("eof while parsing") {
        return Some("The file ends early; it may have been truncated during a sync.".to_string());
    }
    if msg_lower.contains("missing field") {
        return Some("The stored object is missing a required field.".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
        assert_eq!(line_col_to_offset(source, 9, 1), source.len() - 1);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("duplicate field `a`").is_some());
        assert!(generate_help("EOF while parsing an object").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_from_json_points_at_error() {
        let source = "{\n  \"a\": 1,\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let diag = SyntaxError::from_json(&err, source, "x.property.json");
        assert!(diag.to_string().starts_with("JSON syntax error in x.property.json"));
        assert!(diag.offset() > 0);
    }

    #[test]
    fn test_from_yaml_message() {
        let source = "a: [1, 2\n";
        let err = serde_yml::from_str::<serde_yml::Value>(source).unwrap_err();
        let diag = SyntaxError::from_yaml(&err, source, "obj.yaml");
        assert!(diag.to_string().contains("YAML syntax error in obj.yaml"));
        assert!(!diag.message().is_empty());
    }
}
