//! JSON persistence for [`MemoryStore`].
//!
//! The CLI keeps its store in a single pretty-printed JSON file. Loading and
//! saving go through these functions so errors carry the offending path.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::MemoryStore;
use crate::error::LabelportError;

/// Reads a store from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_store_json(path: &Path) -> Result<MemoryStore, LabelportError> {
    let file = File::open(path).map_err(LabelportError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelportError::StoreJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a store to a JSON file, replacing any previous content.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_store_json(path: &Path, store: &MemoryStore) -> Result<(), LabelportError> {
    let file = File::create(path).map_err(LabelportError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, store).map_err(|source| LabelportError::StoreJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a store from a JSON string.
pub fn from_store_str(json: &str) -> Result<MemoryStore, serde_json::Error> {
    serde_json::from_str(json)
}

/// Writes a store to a JSON string.
pub fn to_store_string(store: &MemoryStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(store)
}
