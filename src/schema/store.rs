use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{Column, ValueType};
use crate::error::{CleanError, Result, SnapshotError};

/// Fixed name of the schema snapshot inside the working directory.
pub const SNAPSHOT_FILE: &str = "meta_data.json";

/// Column name → declared value type, as persisted by an earlier run.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    columns: Vec<Column>,
    by_name: HashMap<String, ValueType>,
}

impl SchemaSnapshot {
    /// Build a snapshot from column definitions. Names must be unique.
    pub fn new(columns: Vec<Column>) -> Result<Self, SnapshotError> {
        if columns.is_empty() {
            return Err(SnapshotError::Empty);
        }
        let mut by_name = HashMap::with_capacity(columns.len());
        for col in &columns {
            if by_name.insert(col.name.clone(), col.ty).is_some() {
                return Err(SnapshotError::DuplicateColumn {
                    column: col.name.clone(),
                });
            }
        }
        Ok(Self { columns, by_name })
    }

    /// Load the snapshot at `path`. Any failure here is fatal for the run.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fail = |reason: String| CleanError::SchemaSnapshot {
            path: path.to_path_buf(),
            reason,
        };

        let data = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let columns: Vec<Column> =
            serde_json::from_str(&data).map_err(|e| fail(format!("corrupt snapshot: {}", e)))?;
        let snapshot = Self::new(columns).map_err(|e| fail(e.to_string()))?;

        debug!(path = %path.display(), columns = snapshot.len(), "loaded schema snapshot");
        Ok(snapshot)
    }

    /// Load `<dir>/meta_data.json`.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path: PathBuf = dir.as_ref().join(SNAPSHOT_FILE);
        Self::load(path)
    }

    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.by_name.get(name).copied()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
