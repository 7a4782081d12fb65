//! Startup loading for the rules dataset and engine settings.
//!
//! Both files are JSON. Loading happens once, before any engine call; the
//! engine itself never touches the filesystem.

use crate::settings::EngineSettings;
use crate::tables::{RuleTables, RulesDataset, TableError, DATASET_VERSION};
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading or saving data files.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid rules table: {0}")]
    InvalidTable(#[from] TableError),
}

// ============================================================================
// Rules Dataset
// ============================================================================

/// Parse and validate a rules dataset.
pub fn parse_dataset(content: &str) -> Result<RuleTables, PersistError> {
    let dataset: RulesDataset = serde_json::from_str(content)?;

    if dataset.version != DATASET_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: DATASET_VERSION,
            found: dataset.version,
        });
    }

    Ok(RuleTables::from_dataset(dataset)?)
}

/// Load a rules dataset from a JSON file.
pub async fn load_dataset(path: impl AsRef<Path>) -> Result<RuleTables, PersistError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await?;
    let tables = parse_dataset(&content)?;
    tracing::info!(path = %path.display(), "Loaded rules dataset");
    Ok(tables)
}

/// Load a rules dataset, falling back to the bundled tables when the file
/// does not exist. Any other failure is returned.
pub async fn load_dataset_or_bundled(
    path: impl AsRef<Path>,
) -> Result<RuleTables, PersistError> {
    let path = path.as_ref();
    match load_dataset(path).await {
        Err(PersistError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Rules dataset not found, using bundled tables");
            Ok(RuleTables::bundled()?.clone())
        }
        other => other,
    }
}

/// Write tables out in dataset form.
pub async fn save_dataset(
    tables: &RuleTables,
    path: impl AsRef<Path>,
) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(&tables.to_dataset())?;
    fs::write(path, content).await?;
    Ok(())
}

// ============================================================================
// Settings
// ============================================================================

pub fn parse_settings(content: &str) -> Result<EngineSettings, PersistError> {
    Ok(serde_json::from_str(content)?)
}

/// Load engine settings. A missing file yields the defaults.
pub async fn load_settings(path: impl AsRef<Path>) -> Result<EngineSettings, PersistError> {
    let path = path.as_ref();
    match fs::read_to_string(path).await {
        Ok(content) => parse_settings(&content),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No settings file, using defaults");
            Ok(EngineSettings::default())
        }
        Err(err) => Err(err.into()),
    }
}
