//! Zip archive of a batch's documents.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{EngineError, EngineResult};
use crate::models::{OutputFormat, PayPeriod};

/// Returns `payslips_<period>_<format>.zip`, or `payslips_<format>.zip`
/// when the period is empty.
pub fn archive_name(period: &PayPeriod, format: OutputFormat) -> String {
    let period = sanitize_filename::sanitize(period.label().trim());
    if period.is_empty() {
        format!("payslips_{format}.zip")
    } else {
        format!("payslips_{period}_{format}.zip")
    }
}

fn archive_error(path: &Path, e: zip::result::ZipError) -> EngineError {
    EngineError::Archive {
        message: format!("{}: {e}", path.display()),
    }
}

/// Writes `files` into a deflated zip at `path`, flat, by file name.
///
/// # Errors
///
/// [`EngineError::Io`] if a file cannot be read or the archive cannot be
/// created, [`EngineError::Archive`] if two files share a name or the zip
/// writer fails.
pub fn write_archive(path: &Path, files: &[PathBuf]) -> EngineResult<()> {
    let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut seen = HashSet::new();
    for source in files {
        let Some(name) = source.file_name().and_then(|n| n.to_str()) else {
            return Err(EngineError::Archive {
                message: format!("{}: no UTF-8 file name", source.display()),
            });
        };
        if !seen.insert(name.to_string()) {
            return Err(EngineError::Archive {
                message: format!("{}: duplicate entry '{name}'", path.display()),
            });
        }
        let bytes = fs::read(source).map_err(|e| EngineError::io(source, e))?;
        zip.start_file(name, options)
            .map_err(|e| archive_error(path, e))?;
        zip.write_all(&bytes).map_err(|e| EngineError::io(path, e))?;
        debug!(file = name, bytes = bytes.len(), "archived");
    }

    zip.finish().map_err(|e| archive_error(path, e))?;
    Ok(())
}
