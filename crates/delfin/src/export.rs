//! JSON export of the order set.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::order::{OrderRecord, DATE_FORMAT};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No hay datos para exportar")]
    Empty,

    #[error("Failed to serialize orders: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write export '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializes every record, including `id` and `timestamp`, as an indented
/// JSON array.
pub fn export(records: &[OrderRecord]) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    Ok(serde_json::to_vec_pretty(records)?)
}

/// `pedidos_<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("pedidos_{}.json", date.format(DATE_FORMAT))
}

/// Writes the export artifact into `dir` and returns its path.
pub fn write_export(
    dir: &Path,
    records: &[OrderRecord],
    today: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let bytes = export(records)?;
    let path = dir.join(export_file_name(today));

    std::fs::create_dir_all(dir).map_err(|e| ExportError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;
    std::fs::write(&path, bytes).map_err(|e| ExportError::Write {
        path: path.clone(),
        source: e,
    })?;

    log::info!("Exported {} orders to {}", records.len(), path.display());
    Ok(path)
}
