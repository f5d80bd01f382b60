// src/process/mod.rs

pub mod classify;
pub mod header;
pub mod normalize;
pub mod timestamp;
pub mod utils;
pub mod write;

pub use classify::{classify_column, classify_columns, Classification, ColumnRole, LogicalTable};
pub use header::{reconstruct_header, HeaderKey, ReconstructedHeader};
pub use normalize::{fill_missing, normalize_batch};
pub use timestamp::{decode_epoch_seconds, decode_timestamp_column};
pub use write::{target_partitions, PartitionWriter, WriteSummary};
