//! Export of model weights into a self-contained directory
//!
//! For each record, every weight file is soft-linked as `<outdir>/<name>`
//! (suffixed with `_<hash prefix>` when a hash length is given) and the record,
//! annotated with the link it got, is written next to it as `<name>.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::data::{record_name, to_pretty_json, Record};

/// Errors that can occur while exporting
#[derive(Debug, Error)]
pub enum ExportError {
    /// The output directory must not exist beforehand
    #[error("Output directory {} already exists", .0.display())]
    OutputExists(PathBuf),

    /// A record has no string `name`
    #[error("Record has no 'name' field: {0}")]
    MissingName(String),

    /// Creating directories or writing metadata failed
    #[error("Export I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The metadata could not be encoded
    #[error("Failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "soft links are only supported on unix",
    ))
}

/// Exports `records` into a fresh `outdir`
///
/// A weight whose link cannot be created is logged and skipped; the record's
/// metadata is still written.
///
/// # Arguments
/// * `records` - Model records to export
/// * `outdir` - Directory to create; must not exist
/// * `hash_length` - Number of hash characters appended to each link name (0 for none)
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` with the metadata files written, in record order
/// * `Err(ExportError)` if the directory exists or a record cannot be written
pub fn export_models(
    records: &[Record],
    outdir: &Path,
    hash_length: usize,
) -> Result<Vec<PathBuf>, ExportError> {
    if outdir.exists() {
        return Err(ExportError::OutputExists(outdir.to_path_buf()));
    }
    fs::create_dir_all(outdir)?;
    debug!(count = records.len(), outdir = %outdir.display(), "exporting models");

    records
        .iter()
        .map(|record| export_model(record.clone(), outdir, hash_length))
        .collect()
}

fn export_model(
    mut record: Record,
    outdir: &Path,
    hash_length: usize,
) -> Result<PathBuf, ExportError> {
    let name = record_name(&record)
        .ok_or_else(|| ExportError::MissingName(record.to_string()))?
        .to_string();
    let link_base = outdir.join(&name);
    if let Some(parent) = link_base.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Some(weights) = record.get_mut("weights").and_then(Value::as_array_mut) {
        for weight in weights.iter_mut() {
            let Some(target) = weight
                .get("file_path")
                .and_then(Value::as_str)
                .map(PathBuf::from)
            else {
                continue;
            };

            let mut link = link_base.clone().into_os_string();
            if hash_length > 0 {
                if let Some(hash) = weight.get("hash").and_then(Value::as_str) {
                    let prefix: String = hash.chars().take(hash_length).collect();
                    link.push(format!("_{}", prefix));
                }
            }
            let link = PathBuf::from(link);

            match symlink(&target, &link) {
                Ok(()) => {
                    debug!(target = %target.display(), link = %link.display(), "weight linked");
                    if let Value::Object(fields) = weight {
                        fields.insert(
                            "soft-link".to_string(),
                            Value::String(link.display().to_string()),
                        );
                    }
                }
                Err(e) => error!(
                    link = %link.display(),
                    error = %e,
                    "failed to create weight soft-link"
                ),
            }
        }
    }

    let mut meta_path = link_base.into_os_string();
    meta_path.push(".json");
    let meta_path = PathBuf::from(meta_path);

    fs::write(&meta_path, to_pretty_json(&record)?)?;
    debug!(model = %name, metadata = %meta_path.display(), "model exported");

    Ok(meta_path)
}
