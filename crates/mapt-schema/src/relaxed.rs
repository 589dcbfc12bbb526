//! Permissive JSON loading.
//!
//! Slice and style documents are hand-edited, so comments, trailing commas,
//! unquoted keys and single-quoted strings are all accepted (JSON5).

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::SchemaError;

/// Parse permissive JSON text into `T`.
pub fn parse_relaxed<T: DeserializeOwned>(text: &str) -> Result<T, json5::Error> {
    json5::from_str(text)
}

/// Read and parse a permissive JSON document from disk.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, SchemaError> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_relaxed(&text).map_err(|e| SchemaError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
