//! Exchange document reader and writer.
//!
//! The exchange document is the portable half of an export package: a COCO
//! style JSON object with `images`, `categories` and `annotations` arrays.
//! This module defines explicit schema structs for it and the conversions
//! from store records.
//!
//! # Schema notes
//!
//! - Category keypoint schemas use the exchange names `keypoints` (labels)
//!   and `skeleton` (edges). Categories without keypoint labels carry
//!   neither field.
//! - An annotation carries spatial content as polygon `segmentation`,
//!   flat `keypoints` triples, or both. See [`Geometry`].
//! - Readers are lenient where external tools disagree: `iscrowd`/`isbbox`
//!   accept `0`/`1` as well as booleans, `null` metadata reads as empty, and
//!   a non-polygon segmentation (RLE) reads as no segmentation.

mod schema;

pub use schema::{ExchangeAnnotation, ExchangeCategory, ExchangeDocument, ExchangeImage, Geometry};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::LabelportError;

/// Reads an exchange document from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use labelport::exchange::read_exchange_json;
///
/// let document = read_exchange_json(Path::new("annotations.json"))?;
/// println!("{} annotations", document.annotations.len());
/// # Ok::<(), labelport::LabelportError>(())
/// ```
pub fn read_exchange_json(path: &Path) -> Result<ExchangeDocument, LabelportError> {
    let file = File::open(path).map_err(LabelportError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelportError::ExchangeJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes an exchange document to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_exchange_json(path: &Path, document: &ExchangeDocument) -> Result<(), LabelportError> {
    let file = File::create(path).map_err(LabelportError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer(writer, document).map_err(|source| LabelportError::ExchangeJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an exchange document from a JSON string.
pub fn from_exchange_str(json: &str) -> Result<ExchangeDocument, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads an exchange document from a JSON byte slice.
///
/// Used by the fuzz target to skip UTF-8 validation.
pub fn from_exchange_slice(bytes: &[u8]) -> Result<ExchangeDocument, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes an exchange document to a pretty-printed JSON string.
pub fn to_exchange_string(document: &ExchangeDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}
