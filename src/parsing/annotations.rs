//! Loading annotation records from JSON files.
//!
//! A file may hold a single annotation object or a list of them. All field
//! validation lives in the serde layer of [`Annotation`]; this module only
//! handles the file/text plumbing.

use std::path::Path;

use thiserror::Error;

use crate::core::annotation::Annotation;

#[derive(Error, Debug)]
pub enum AnnotationParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid annotation record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads one or more annotations from a JSON file.
///
/// # Errors
///
/// Returns `AnnotationParseError::Io` if the file cannot be read, or `Json`
/// when a record is malformed.
pub fn parse_file(path: &Path) -> Result<Vec<Annotation>, AnnotationParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_text(&content)
}

/// Parses a single annotation object or a JSON list of them.
///
/// # Errors
///
/// Returns `AnnotationParseError::Json` when the text is not valid JSON or a
/// record fails validation.
pub fn parse_text(text: &str) -> Result<Vec<Annotation>, AnnotationParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(AnnotationParseError::from))
            .collect(),
        single => Ok(vec![serde_json::from_value(single)?]),
    }
}
