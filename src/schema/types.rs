// src/schema/types.rs

use serde::{Deserialize, Serialize};

/// Declared value type of a raw column.
///
/// The aliases accept the dtype spellings found in older snapshots.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[serde(alias = "float64", alias = "float32", alias = "double")]
    Float,
    #[serde(alias = "int64", alias = "int32", alias = "int")]
    Integer,
    #[serde(alias = "object", alias = "category", alias = "string", alias = "str")]
    Text,
}

/// A single column definition as recorded in the schema snapshot.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub ty: ValueType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}
