// src/process/write.rs

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::OutputFormat;
use crate::error::{CleanError, Result, WriteError};
use crate::process::classify::LogicalTable;
use crate::process::timestamp::TIMESTAMP_FORMAT;
use crate::table::PartitionedTable;

/// Number of output partitions for a table currently split into `current`.
///
/// The parameter table is always one file; the others shrink by `divisor`,
/// never below one.
pub fn target_partitions(table: LogicalTable, current: usize, divisor: usize) -> usize {
    match table {
        LogicalTable::Parameter => 1,
        _ => (current / divisor.max(1)).max(1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub table: LogicalTable,
    pub dir: PathBuf,
    pub partitions: usize,
    pub rows: usize,
}

/// Persists logical tables as directories of partition files.
#[derive(Debug, Clone, Copy)]
pub struct PartitionWriter {
    format: OutputFormat,
    divisor: usize,
}

impl PartitionWriter {
    pub fn new(format: OutputFormat, divisor: usize) -> Self {
        Self { format, divisor }
    }

    /// Write `data` into `dir` (which must already exist).
    ///
    /// The parameter table is de-duplicated first. Partitions are written in
    /// parallel, each to a `.tmp` sibling that is renamed into place.
    #[instrument(level = "info", skip(self, data, dir), fields(dir = %dir.display()))]
    pub fn write_table(&self, table: LogicalTable, data: &PartitionedTable, dir: &Path) -> Result<WriteSummary> {
        let start = Instant::now();
        let wrap = |source: WriteError| CleanError::Write {
            table,
            path: dir.to_path_buf(),
            source,
        };

        let deduped;
        let data = if table == LogicalTable::Parameter {
            deduped = data.drop_duplicates()?;
            debug!(before = data.num_rows(), after = deduped.num_rows(), "dropped duplicate rows");
            &deduped
        } else {
            data
        };
        let target = target_partitions(table, data.num_partitions(), self.divisor);
        let data = data.repartition(target)?;

        remove_stale_parts(dir).map_err(wrap)?;

        data.partitions()
            .par_iter()
            .enumerate()
            .try_for_each(|(idx, batch)| {
                let path = dir.join(format!("part-{:05}.{}", idx, self.format.extension()));
                self.write_partition(batch, &path)
            })
            .map_err(wrap)?;

        let summary = WriteSummary {
            table,
            dir: dir.to_path_buf(),
            partitions: data.num_partitions(),
            rows: data.num_rows(),
        };
        info!(
            partitions = summary.partitions,
            rows = summary.rows,
            elapsed = ?start.elapsed(),
            "wrote table"
        );
        Ok(summary)
    }

    fn write_partition(&self, batch: &RecordBatch, out_path: &Path) -> Result<(), WriteError> {
        let temp_path = out_path.with_extension("tmp");
        let file = File::create(&temp_path)?;

        match self.format {
            OutputFormat::Csv => {
                let mut writer = WriterBuilder::new()
                    .with_header(true)
                    .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
                    .build(file);
                writer.write(batch)?;
                writer.into_inner().sync_all()?;
            }
            OutputFormat::Parquet => {
                let props = WriterProperties::builder()
                    .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
                    .build();
                let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
                writer.write(batch)?;
                writer.close()?;
            }
        }

        fs::rename(&temp_path, out_path)?;
        debug!(path = %out_path.display(), rows = batch.num_rows(), "wrote partition");
        Ok(())
    }
}

/// Remove partition files left by an earlier run.
fn remove_stale_parts(dir: &Path) -> Result<(), WriteError> {
    let pattern = format!("{}/part-*", glob::Pattern::escape(&dir.to_string_lossy()));
    for entry in glob(&pattern)? {
        fs::remove_file(entry?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn table(rows_per_part: &[&[(i64, &str)]]) -> PartitionedTable {
        let schema = Arc::new(Schema::new(vec![
            Field::new("phase", DataType::Utf8, true),
            Field::new("event_index", DataType::Int64, true),
        ]));
        let parts = rows_per_part
            .iter()
            .map(|rows| {
                RecordBatch::try_new(
                    schema.clone(),
                    vec![
                        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
                        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
                    ],
                )
                .unwrap()
            })
            .collect();
        PartitionedTable::try_new(schema, parts).unwrap()
    }

    fn part_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = glob(&format!("{}/*", dir.display()))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_target_partitions() {
        for p in 0..200 {
            assert_eq!(target_partitions(LogicalTable::Hi, p, 20), std::cmp::max(1, p / 20));
            assert_eq!(target_partitions(LogicalTable::Parameter, p, 20), 1);
        }
        assert_eq!(target_partitions(LogicalTable::Other, 45, 20), 2);
        assert_eq!(target_partitions(LogicalTable::Hu, 19, 20), 1);
    }

    #[test]
    fn test_parameter_table_deduplicated_into_one_file() {
        let tmp = tempdir().unwrap();
        let data = table(&[&[(1, "L1"), (1, "L1")], &[(2, "L1"), (1, "L1")]]);

        let writer = PartitionWriter::new(OutputFormat::Csv, 20);
        let summary = writer
            .write_table(LogicalTable::Parameter, &data, tmp.path())
            .unwrap();
        assert_eq!(summary.partitions, 1);
        assert_eq!(summary.rows, 2);

        let files = part_files(tmp.path());
        assert_eq!(files, vec![tmp.path().join("part-00000.csv")]);
        let text = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(text, "phase,event_index\nL1,1\nL1,2\n");
    }

    #[test]
    fn test_small_table_clamps_to_one_partition() {
        let tmp = tempdir().unwrap();
        let data = table(&[&[(1, "L1")], &[(2, "L2")], &[(1, "L1")]]);

        // stale output of an earlier, larger run
        fs::write(tmp.path().join("part-00007.csv"), "old").unwrap();

        let writer = PartitionWriter::new(OutputFormat::Csv, 20);
        let summary = writer.write_table(LogicalTable::Hi, &data, tmp.path()).unwrap();
        assert_eq!(summary.partitions, 1);
        // only the parameter table is de-duplicated
        assert_eq!(summary.rows, 3);

        let files = part_files(tmp.path());
        assert_eq!(files.len(), 1);
        let text = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(text.lines().next(), Some("phase,event_index"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_timestamps_written_as_calendar_text() {
        let tmp = tempdir().unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("ts", DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new("1", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMicrosecondArray::from(vec![0, 1_500_000])),
                Arc::new(Float64Array::from(vec![0.0, 2.25])),
            ],
        )
        .unwrap();
        let data = PartitionedTable::try_new(schema, vec![batch]).unwrap();

        PartitionWriter::new(OutputFormat::Csv, 20)
            .write_table(LogicalTable::Hu, &data, tmp.path())
            .unwrap();
        let text = fs::read_to_string(tmp.path().join("part-00000.csv")).unwrap();
        assert_eq!(
            text,
            "ts,1\n1970-01-01 00:00:00,0.0\n1970-01-01 00:00:01.500,2.25\n"
        );
    }

    #[test]
    fn test_parquet_output() {
        let tmp = tempdir().unwrap();
        let data = table(&[&[(1, "L1")], &[(2, "L2")]]);

        let summary = PartitionWriter::new(OutputFormat::Parquet, 20)
            .write_table(LogicalTable::Other, &data, tmp.path())
            .unwrap();
        assert_eq!(summary.partitions, 1);

        let file = File::open(tmp.path().join("part-00000.parquet")).unwrap();
        let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_stale_part_that_cannot_be_removed_fails_the_table() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("part-00003.csv"), "old").unwrap();
        fs::create_dir(tmp.path().join("part-00004.csv")).unwrap();

        assert!(remove_stale_parts(tmp.path()).is_err());

        let data = table(&[&[(1, "L1")]]);
        let err = PartitionWriter::new(OutputFormat::Csv, 20)
            .write_table(LogicalTable::Hu, &data, tmp.path())
            .unwrap_err();
        assert!(matches!(err, CleanError::Write { table: LogicalTable::Hu, .. }));
        assert!(!tmp.path().join("part-00000.csv").exists());
    }

    #[test]
    fn test_missing_directory_is_write_error() {
        let tmp = tempdir().unwrap();
        let data = table(&[&[(1, "L1")]]);
        let err = PartitionWriter::new(OutputFormat::Csv, 20)
            .write_table(LogicalTable::Other, &data, &tmp.path().join("absent"))
            .unwrap_err();
        assert!(matches!(
            err,
            CleanError::Write {
                table: LogicalTable::Other,
                ..
            }
        ));
    }
}
