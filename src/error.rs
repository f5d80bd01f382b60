// src/error.rs

use std::path::PathBuf;

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

use crate::process::classify::LogicalTable;

/// Fatal errors raised while cleaning a run. Column classification problems
/// are not in here: see [`ColumnClassificationError`].
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("schema snapshot {path}: {reason}")]
    SchemaSnapshot { path: PathBuf, reason: String },

    #[error("could not acquire worker pool: {0}")]
    ExecutionContext(String),

    #[error("preparing output directory {path}: {source}")]
    PrepareDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source pattern `{pattern}`: {reason}")]
    SourcePattern { pattern: String, reason: String },

    #[error("no input files match `{pattern}`")]
    NoInput { pattern: String },

    #[error("reading {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("header of {path} differs from the first source file")]
    HeaderMismatch { path: PathBuf },

    #[error("column `{column}` has type {data_type} which cannot be normalized")]
    UnsupportedColumnType { column: String, data_type: DataType },

    #[error("timestamp column `{column}` holds {value}, outside the representable range")]
    TimestampRange { column: String, value: f64 },

    #[error("{table} channel column `{column}` does not end in a channel number")]
    ChannelNameFormat { table: LogicalTable, column: String },

    #[error("{table} channel {channel} is named by both `{first}` and `{second}`")]
    DuplicateChannel {
        table: LogicalTable,
        channel: u32,
        first: String,
        second: String,
    },

    #[error("column `{column}` not found")]
    MissingColumn { column: String },

    #[error("{table} table has no column `{column}` after renaming")]
    SchemaMismatch { table: LogicalTable, column: String },

    #[error("writing {table} table to {path}: {source}")]
    Write {
        table: LogicalTable,
        path: PathBuf,
        #[source]
        source: WriteError,
    },

    #[error("building the missing-value pattern: {0}")]
    NullPattern(#[from] regex::Error),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Storage failure underneath a partitioned write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv encoding: {0}")]
    Arrow(#[from] ArrowError),
    #[error("parquet encoding: {0}")]
    Parquet(#[from] ParquetError),
    #[error("bad cleanup pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("listing stale partitions: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Content problems in a schema snapshot that parsed fine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot declares no columns")]
    Empty,
    #[error("column `{column}` is declared twice")]
    DuplicateColumn { column: String },
}

/// A column name that matches none of the classification rules.
///
/// Non-fatal: the column is left out of every logical table and the run goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column `{column}` cannot be assigned to any table")]
pub struct ColumnClassificationError {
    pub column: String,
}

pub type Result<T, E = CleanError> = std::result::Result<T, E>;
