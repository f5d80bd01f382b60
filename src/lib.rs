pub mod config;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod table;

pub use config::{OutputFormat, PipelineConfig};
pub use error::{CleanError, ColumnClassificationError, SnapshotError, WriteError};
pub use pipeline::{Pipeline, RunReport, Stage};
