// src/schema/arrow.rs

use arrow::datatypes::DataType;

use super::types::ValueType;

/// Map a declared value type into the Arrow type used to read it.
///
/// - Float   → Float64
/// - Integer → Int64
/// - Text    → Utf8
pub fn map_to_arrow_type(ty: ValueType) -> DataType {
    match ty {
        ValueType::Float => DataType::Float64,
        ValueType::Integer => DataType::Int64,
        ValueType::Text => DataType::Utf8,
    }
}
