//! Temporary file management utilities.
//!
//! Helpers for the job-private staging directory and the concat manifest.
//! They rely on the tempfile crate so cleanup happens on drop, including on
//! error paths.

use crate::error::CoreResult;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};

/// Creates a uniquely named staging directory under `parent`. Removed when dropped.
pub fn create_staging_dir(parent: &Path) -> CoreResult<TempDir> {
    std::fs::create_dir_all(parent)?;
    Ok(TempFileBuilder::new()
        .prefix(".powertrim-staging-")
        .tempdir_in(parent)?)
}

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> std::io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)
}
