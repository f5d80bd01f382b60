pub mod arrow;
pub mod derive;
pub mod store;
pub mod types;
pub mod write;

pub use arrow::map_to_arrow_type;
pub use derive::{derive_types, sample_csv};
pub use store::{SchemaSnapshot, SNAPSHOT_FILE};
pub use types::{Column, ValueType};
pub use write::write_snapshot;
