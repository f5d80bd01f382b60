// src/config.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::process::classify::LogicalTable;
use crate::schema::SNAPSHOT_FILE;

/// Default divisor applied to the partition count of HI/HU/Other outputs.
pub const PARTITION_DIVISOR: usize = 20;
pub const ROWS_PER_PARTITION: usize = 50_000;

/// On-disk format of the written partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root holding the schema snapshot and the `data/` output tree.
    pub working_dir: PathBuf,
    /// Glob naming the raw measurement files.
    pub sources: String,
    /// Snapshot location; relative paths resolve against `working_dir`.
    pub snapshot: PathBuf,
    pub rows_per_partition: usize,
    pub partition_divisor: usize,
    /// Worker threads, 0 for one per core.
    pub threads: usize,
    pub format: OutputFormat,
    /// `None` disables the resource monitor.
    pub monitor_interval: Option<Duration>,
}

impl PipelineConfig {
    pub fn new(working_dir: impl Into<PathBuf>, sources: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            sources: sources.into(),
            snapshot: PathBuf::from(SNAPSHOT_FILE),
            rows_per_partition: ROWS_PER_PARTITION,
            partition_divisor: PARTITION_DIVISOR,
            threads: 0,
            format: OutputFormat::Csv,
            monitor_interval: Some(Duration::from_secs(30)),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.working_dir.join("data")
    }

    /// `<working_dir>/data/<table>`
    pub fn output_dir(&self, table: LogicalTable) -> PathBuf {
        self.data_dir().join(table.dir_name())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.working_dir.join(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let cfg = PipelineConfig::new("/srv/pq", "/srv/pq/PQI_raw/*");
        assert_eq!(cfg.output_dir(LogicalTable::Parameter), PathBuf::from("/srv/pq/data/parameter"));
        assert_eq!(cfg.snapshot_path(), PathBuf::from("/srv/pq/meta_data.json"));

        let mut cfg = cfg;
        cfg.snapshot = PathBuf::from("/etc/pq/meta.json");
        assert_eq!(cfg.snapshot_path(), PathBuf::from("/etc/pq/meta.json"));
    }
}
