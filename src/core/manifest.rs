//! Loading of `job_data.json` manifests.
//!
//! Two on-disk layouts exist. Current files are a single JSON object. Files
//! written by older tooling start with one header line (e.g. `!MolSSI job_data 1.0`)
//! followed by the JSON object. The first character of the first line decides.

use crate::core::error::DatastoreError;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "job_data.json";

/// Read and parse the manifest at `path`, tolerating a legacy header line.
pub fn read_manifest(path: &Path) -> Result<Value, DatastoreError> {
    let bytes = fs::read(path).map_err(DatastoreError::IoError)?;
    let text = String::from_utf8(bytes).map_err(|e| DatastoreError::Manifest {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8 text: {e}"),
    })?;
    parse_manifest_text(&text).map_err(|reason| DatastoreError::Manifest {
        path: path.to_path_buf(),
        reason,
    })
}

/// Pure half of [`read_manifest`]. Errors are plain reasons; the caller attaches the path.
pub fn parse_manifest_text(text: &str) -> Result<Value, String> {
    let mut lines = text.lines();
    let first = lines.next().ok_or_else(|| "file is empty".to_string())?;
    let body = match first.chars().next() {
        None => return Err("first line is empty; cannot tell header from JSON".into()),
        Some('{') => text.to_string(),
        Some(_) => lines.collect::<Vec<_>>().join("\n"),
    };
    serde_json::from_str(&body).map_err(|e| format!("invalid JSON: {e}"))
}
