// src/pipeline.rs

use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::config::PipelineConfig;
use crate::error::{CleanError, ColumnClassificationError, Result};
use crate::monitor::ResourceMonitor;
use crate::process::classify::{classify_columns, LogicalTable, TIMESTAMP};
use crate::process::header::reconstruct_header;
use crate::process::normalize::normalize_batch;
use crate::process::write::{PartitionWriter, WriteSummary};
use crate::schema::SchemaSnapshot;
use crate::table::{load_table, PartitionedTable};

/// Steps of a run, in order. There is no branching between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    Loading,
    Normalizing,
    Classifying,
    Reconstructing,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Initializing => "initializing",
            Stage::Loading => "loading",
            Stage::Normalizing => "normalizing",
            Stage::Classifying => "classifying",
            Stage::Reconstructing => "reconstructing",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub unassigned: Vec<ColumnClassificationError>,
    pub written: Vec<WriteSummary>,
}

/// Create `data/{hi,hu,parameter,other}` under the working directory.
/// Existing directories are left alone.
pub fn prepare_output_dirs(config: &PipelineConfig) -> Result<()> {
    for table in LogicalTable::ALL {
        let path = config.output_dir(table);
        fs::create_dir_all(&path).map_err(|source| CleanError::PrepareDir { path, source })?;
    }
    Ok(())
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once. The first fatal error ends the run; tables
    /// already written stay on disk.
    #[instrument(level = "info", skip(self), fields(sources = %self.config.sources))]
    pub fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        enter(Stage::Initializing);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("pq-worker-{}", i))
            .build()
            .map_err(|e| CleanError::ExecutionContext(e.to_string()))?;
        prepare_output_dirs(&self.config)?;
        let snapshot = SchemaSnapshot::load(self.config.snapshot_path())?;
        let _monitor = self.config.monitor_interval.and_then(ResourceMonitor::spawn);
        info!(threads = pool.current_num_threads(), "worker pool ready");

        let report = pool.install(|| self.execute(&snapshot))?;

        enter(Stage::Done);
        info!(elapsed = ?start.elapsed(), "run complete");
        Ok(report)
    }

    fn execute(&self, snapshot: &SchemaSnapshot) -> Result<RunReport> {
        enter(Stage::Loading);
        let raw = load_table(&self.config.sources, snapshot, self.config.rows_per_partition)?;

        enter(Stage::Normalizing);
        let clean = raw.map_partitions(|batch| normalize_batch(batch, TIMESTAMP))?;

        enter(Stage::Classifying);
        let classification = classify_columns(clean.column_names());
        if !classification.unassigned.is_empty() {
            error!(
                count = classification.unassigned.len(),
                "some columns could not be assigned and were dropped"
            );
        }
        let mut tables: Vec<(LogicalTable, PartitionedTable)> = Vec::with_capacity(4);
        for (table, columns) in classification.groups.iter() {
            info!(%table, columns = columns.len(), "classified");
            tables.push((table, clean.select(columns)?));
        }

        enter(Stage::Reconstructing);
        for (table, data) in tables.iter_mut() {
            if !table.is_channel_table() {
                continue;
            }
            let header = reconstruct_header(*table, &data.column_names())?;
            *data = header.apply(*table, data)?;
            info!(%table, channels = header.renames.len(), "reconstructed header");
        }

        enter(Stage::Writing);
        let writer = PartitionWriter::new(self.config.format, self.config.partition_divisor);
        let results: Vec<Result<WriteSummary>> = tables
            .par_iter()
            .map(|(table, data)| writer.write_table(*table, data, &self.config.output_dir(*table)))
            .collect();

        let mut written = Vec::with_capacity(results.len());
        let mut first_err = None;
        for result in results {
            match result {
                Ok(summary) => written.push(summary),
                Err(e) => {
                    error!("{}", e);
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        Ok(RunReport {
            unassigned: classification.unassigned,
            written,
        })
    }
}

fn enter(stage: Stage) {
    info!("{:#^80}", format!(" {} ", stage));
}
