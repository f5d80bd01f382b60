use arrow::array::{Array, ArrayRef, AsArray, LargeStringArray, PrimitiveArray, StringArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type,
};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::trace;

use crate::error::{CleanError, Result};
use crate::process::timestamp::decode_timestamp_column;

/// Fill value for missing text cells.
pub const TEXT_FILL: &str = "empty";

/// Replace every missing value of `array` with the default for its type:
/// 0.0 for floats, 0 for integers, `"empty"` for text. NaN counts as missing
/// in float columns.
pub fn fill_missing(column: &str, array: &ArrayRef) -> Result<ArrayRef> {
    trace!(column, nulls = array.null_count(), "filling missing values");
    let filled = match array.data_type() {
        DataType::Float64 => fill_primitive::<Float64Type>(array, 0.0, f64::is_nan),
        DataType::Float32 => fill_primitive::<Float32Type>(array, 0.0, f32::is_nan),
        DataType::Int64 => fill_primitive::<Int64Type>(array, 0, |_| false),
        DataType::Int32 => fill_primitive::<Int32Type>(array, 0, |_| false),
        DataType::Int16 => fill_primitive::<Int16Type>(array, 0, |_| false),
        DataType::Int8 => fill_primitive::<Int8Type>(array, 0, |_| false),
        DataType::Utf8 | DataType::LargeUtf8 if array.null_count() == 0 => array.clone(),
        DataType::Utf8 => {
            let filled: StringArray = array
                .as_string::<i32>()
                .iter()
                .map(|v| Some(v.unwrap_or(TEXT_FILL)))
                .collect();
            Arc::new(filled) as ArrayRef
        }
        DataType::LargeUtf8 => {
            let filled: LargeStringArray = array
                .as_string::<i64>()
                .iter()
                .map(|v| Some(v.unwrap_or(TEXT_FILL)))
                .collect();
            Arc::new(filled) as ArrayRef
        }
        other => {
            return Err(CleanError::UnsupportedColumnType {
                column: column.to_string(),
                data_type: other.clone(),
            })
        }
    };
    Ok(filled)
}

/// Replace nulls, and values `is_gap` flags, with `fill`. Hands back the input
/// array when nothing needs replacing.
fn fill_primitive<T: ArrowPrimitiveType>(
    array: &ArrayRef,
    fill: T::Native,
    is_gap: impl Fn(T::Native) -> bool,
) -> ArrayRef {
    let values = array.as_primitive::<T>();
    let has_gap = values.iter().flatten().any(|v| is_gap(v));
    if values.null_count() == 0 && !has_gap {
        return array.clone();
    }
    let filled: PrimitiveArray<T> = values
        .iter()
        .map(|v| Some(v.filter(|x| !is_gap(*x)).unwrap_or(fill)))
        .collect();
    Arc::new(filled)
}

/// Fill every column of one partition, then decode `timestamp_column`
/// (when present) from epoch seconds into calendar timestamps.
pub fn normalize_batch(batch: &RecordBatch, timestamp_column: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let filled = fill_missing(field.name(), array)?;
        if field.name() == timestamp_column {
            let decoded = decode_timestamp_column(field.name(), &filled)?;
            fields.push(field.as_ref().clone().with_data_type(decoded.data_type().clone()));
            columns.push(decoded);
        } else {
            fields.push(field.as_ref().clone());
            columns.push(filled);
        }
    }

    let schema = Arc::new(arrow::datatypes::Schema::new_with_metadata(
        fields,
        schema.metadata().clone(),
    ));
    RecordBatch::try_new(schema, columns).map_err(Into::into)
}
