use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use glob::glob;
use rayon::prelude::*;
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::PartitionedTable;
use crate::error::{CleanError, Result};
use crate::process::utils::{clean_str, is_unnamed, na_regex};
use crate::schema::{map_to_arrow_type, SchemaSnapshot, ValueType};

/// Resolve `pattern` into the list of files it names, sorted.
pub fn resolve_sources(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern).map_err(|e| CleanError::SourcePattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("skipping unreadable source entry: {}", e);
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(CleanError::NoInput {
            pattern: pattern.to_string(),
        });
    }
    Ok(paths)
}

fn read_header(path: &Path) -> Result<Vec<String>> {
    let load_err = |reason: String| CleanError::Load {
        path: path.to_path_buf(),
        reason,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| load_err(e.to_string()))?;
    let headers = rdr.headers().map_err(|e| load_err(e.to_string()))?;
    Ok(headers.iter().map(clean_str).collect())
}

/// Read schema for a file header plus the projection that drops index columns.
struct FileLayout {
    read_schema: Arc<Schema>,
    projection: Vec<usize>,
    kept: Vec<String>,
}

fn layout_for(header: &[String], snapshot: &SchemaSnapshot) -> FileLayout {
    let mut fields = Vec::with_capacity(header.len());
    let mut projection = Vec::with_capacity(header.len());
    let mut kept = Vec::with_capacity(header.len());

    for (idx, name) in header.iter().enumerate() {
        if is_unnamed(name) {
            fields.push(Field::new(name, DataType::Utf8, true));
            continue;
        }
        let ty = snapshot.value_type(name).unwrap_or_else(|| {
            warn!(column = %name, "column missing from schema snapshot, reading as text");
            ValueType::Text
        });
        fields.push(Field::new(name, map_to_arrow_type(ty), true));
        projection.push(idx);
        kept.push(name.clone());
    }

    FileLayout {
        read_schema: Arc::new(Schema::new(fields)),
        projection,
        kept,
    }
}

fn read_partitions(
    path: &Path,
    layout: &FileLayout,
    missing: &Regex,
    rows_per_partition: usize,
) -> Result<Vec<RecordBatch>> {
    let load_err = |reason: String| CleanError::Load {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
    let reader = ReaderBuilder::new(layout.read_schema.clone())
        .with_header(true)
        .with_batch_size(rows_per_partition.max(1))
        .with_projection(layout.projection.clone())
        .with_null_regex(missing.clone())
        .build(file)
        .map_err(|e| load_err(e.to_string()))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| load_err(e.to_string()))?;
    debug!(path = %path.display(), partitions = batches.len(), "read source file");
    Ok(batches)
}

/// Load every file matched by `pattern` as one partitioned table.
///
/// Value types come from `snapshot`. `Unnamed` index columns are dropped, and
/// every file must carry the same header as the first one. Empty cells and the
/// usual NA spellings (`NA`, `NaN`, `null`, ...) load as nulls in every column.
#[instrument(level = "info", skip(snapshot))]
pub fn load_table(pattern: &str, snapshot: &SchemaSnapshot, rows_per_partition: usize) -> Result<PartitionedTable> {
    let paths = resolve_sources(pattern)?;
    info!(files = paths.len(), "loading sources");

    let first_header = read_header(&paths[0])?;
    let layout = layout_for(&first_header, snapshot);
    let dropped = first_header.len() - layout.kept.len();
    if dropped > 0 {
        debug!(dropped, "dropping unnamed index columns");
    }
    let schema = Arc::new(layout.read_schema.project(&layout.projection)?);
    let missing = na_regex()?;

    let per_file: Vec<Vec<RecordBatch>> = paths
        .par_iter()
        .map(|path| {
            if read_header(path)? != first_header {
                return Err(CleanError::HeaderMismatch { path: path.clone() });
            }
            read_partitions(path, &layout, &missing, rows_per_partition)
        })
        .collect::<Result<_>>()?;

    let partitions: Vec<RecordBatch> = per_file.into_iter().flatten().collect();
    let table = PartitionedTable::try_new(schema, partitions)?;
    info!(
        columns = layout.kept.len(),
        partitions = table.num_partitions(),
        rows = table.num_rows(),
        "loaded raw table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Float64Type, Int64Type};
    use std::fs;
    use tempfile::tempdir;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::new(vec![
            Column::new("ts", ValueType::Float),
            Column::new("event_index", ValueType::Integer),
            Column::new("phase", ValueType::Text),
            Column::new("hi01", ValueType::Float),
        ])
        .unwrap()
    }

    #[test]
    fn test_load_drops_unnamed_and_splits_partitions() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            ",ts,event_index,phase,hi01\n0,1.5,1,L1,\n1,2.5,2,,0.25\n2,3.5,3,L3,1\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("b.csv"),
            ",ts,event_index,phase,hi01\n0,4.5,4,L1,2\n",
        )
        .unwrap();

        let pattern = format!("{}/*.csv", tmp.path().display());
        let table = load_table(&pattern, &snapshot(), 2).unwrap();

        assert_eq!(table.column_names(), vec!["ts", "event_index", "phase", "hi01"]);
        // a.csv → 2 partitions, b.csv → 1
        assert_eq!(table.num_partitions(), 3);
        assert_eq!(table.num_rows(), 4);

        let first = &table.partitions()[0];
        assert!(first.column(3).is_null(0));
        assert_eq!(first.column(1).as_primitive::<Int64Type>().value(1), 2);
        assert!(first.column(2).is_null(1));
        let last = &table.partitions()[2];
        assert_eq!(last.column(0).as_primitive::<Float64Type>().value(0), 4.5);
    }

    #[test]
    fn test_na_tokens_load_as_nulls() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "ts,event_index,phase,hi01\nnan,NA,N/A,NaN\n1.0,2,L1,null\n2.0,3,NAN,0.5\n",
        )
        .unwrap();

        let pattern = format!("{}/*.csv", tmp.path().display());
        let table = load_table(&pattern, &snapshot(), 10).unwrap();
        let batch = &table.partitions()[0];

        for col in 0..4 {
            assert!(batch.column(col).is_null(0), "column {}", col);
        }
        assert!(batch.column(3).is_null(1));
        // only exact tokens count as missing
        assert_eq!(batch.column(2).as_string::<i32>().value(2), "NAN");
        assert_eq!(batch.column(3).as_primitive::<Float64Type>().value(2), 0.5);
    }

    #[test]
    fn test_header_mismatch() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.csv"), "ts,phase\n1.0,L1\n").unwrap();
        fs::write(tmp.path().join("b.csv"), "phase,ts\nL1,1.0\n").unwrap();

        let pattern = format!("{}/*.csv", tmp.path().display());
        let err = load_table(&pattern, &snapshot(), 10).unwrap_err();
        assert!(matches!(err, CleanError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_no_input() {
        let tmp = tempdir().unwrap();
        let pattern = format!("{}/*.csv", tmp.path().display());
        assert!(matches!(
            resolve_sources(&pattern),
            Err(CleanError::NoInput { .. })
        ));
        assert!(matches!(
            resolve_sources("[unclosed"),
            Err(CleanError::SourcePattern { .. })
        ));
    }
}
