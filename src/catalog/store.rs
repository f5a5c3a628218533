//! Catalog persistence as a pretty-printed JSON array

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::Catalog;
use crate::types::VideoRecord;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CatalogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a catalog load went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Parsed this many records
    Loaded(usize),
    /// No catalog file yet
    Missing,
    /// File exists but could not be read or parsed
    Unreadable(String),
}

impl Catalog {
    /// Load a catalog, starting empty when the file is missing or unreadable
    pub fn load(path: &Path) -> (Self, LoadStatus) {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No catalog at {}, starting empty", path.display());
                return (Self::new(), LoadStatus::Missing);
            }
            Err(e) => {
                warn!("Cannot read catalog {}: {}, starting empty", path.display(), e);
                return (Self::new(), LoadStatus::Unreadable(e.to_string()));
            }
        };

        if contents.trim().is_empty() {
            return (Self::new(), LoadStatus::Loaded(0));
        }

        match serde_json::from_str::<Vec<VideoRecord>>(&contents) {
            Ok(records) => {
                let count = records.len();
                (Self::from_records(records), LoadStatus::Loaded(count))
            }
            Err(e) => {
                warn!("Catalog {} is corrupt: {}, starting empty", path.display(), e);
                (Self::new(), LoadStatus::Unreadable(e.to_string()))
            }
        }
    }

    /// Write the catalog atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }

        let mut encoded = serde_json::to_string_pretty(&self.records)?;
        encoded.push('\n');

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| CatalogError::io(&temp_path, e))?;
        file.write_all(encoded.as_bytes())
            .map_err(|e| CatalogError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| CatalogError::io(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| CatalogError::io(path, e))?;
        Ok(())
    }

    /// Copy an unreadable catalog aside so a later save does not lose it
    pub fn preserve_unreadable(path: &Path) -> Result<PathBuf, CatalogError> {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".corrupt");
        let backup = PathBuf::from(backup);
        fs::copy(path, &backup).map_err(|e| CatalogError::io(&backup, e))?;
        Ok(backup)
    }
}
