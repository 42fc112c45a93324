//! Packaging an export directory into a gzip-compressed tarball.
//!
//! The archive sits next to the directory and is named after it. The
//! directory is removed only after the tarball has been fully written, but
//! the two steps are not atomic: an interrupted run can leave both behind,
//! or a partial tarball. Callers re-running an export should expect to
//! clean up such leftovers.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::LabelportError;

/// Compresses `source_dir` into `<source_dir>.tar.gz` and deletes the directory.
///
/// The tarball's single top-level entry is the directory's own name.
///
/// # Errors
/// Returns an error if the directory has no file name, the tarball cannot
/// be written, or the directory cannot be removed.
pub fn archive(source_dir: &Path) -> Result<PathBuf, LabelportError> {
    let name = source_dir
        .file_name()
        .ok_or_else(|| LabelportError::InvalidPath {
            path: source_dir.to_path_buf(),
            reason: "archive source has no directory name".to_string(),
        })?
        .to_os_string();

    let mut archive_name = name.clone();
    archive_name.push(".tar.gz");
    let archive_path = source_dir.with_file_name(archive_name);

    write_tarball(source_dir, Path::new(&name), &archive_path).map_err(|source| {
        LabelportError::Archive {
            path: archive_path.clone(),
            source,
        }
    })?;
    tracing::debug!(archive = %archive_path.display(), "archive written");

    fs::remove_dir_all(source_dir)?;
    Ok(archive_path)
}

fn write_tarball(source_dir: &Path, top_level: &Path, archive_path: &Path) -> io::Result<()> {
    let file = File::create(archive_path)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(top_level, source_dir)?;

    let encoder = builder.into_inner()?;
    encoder.finish()?.flush()
}
