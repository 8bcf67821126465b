use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let file_path = file_path.as_ref();
    let data = fs::read_to_string(file_path).inspect_err(|e| {
        log::error!("Could not read '{}': {}", file_path.display(), e);
    })?;

    log::debug!("Read {} bytes from '{}'.", data.len(), file_path.display());
    parse_json_str(&data)
}

/// Parses an in-memory JSON document into `T`.
pub fn parse_json_str<T: DeserializeOwned>(data: &str) -> Result<T> {
    let parsed: T = serde_json::from_str(data).inspect_err(|e| {
        log::error!("Malformed JSON at line {}, column {}: {}", e.line(), e.column(), e);
    })?;
    Ok(parsed)
}
