use arrow::array::{Array, ArrayRef, AsArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use chrono::{DateTime, NaiveDateTime};
use std::sync::Arc;

use crate::error::{CleanError, Result};

/// Format used when timestamps are written out as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Epoch seconds → microseconds since the UTC epoch, rounded.
/// `None` for non-finite values and anything chrono cannot represent.
pub fn epoch_seconds_to_micros(secs: f64) -> Option<i64> {
    let micros = (secs * MICROS_PER_SECOND).round();
    if !micros.is_finite() || micros < i64::MIN as f64 || micros >= i64::MAX as f64 {
        return None;
    }
    let micros = micros as i64;
    DateTime::from_timestamp_micros(micros).map(|_| micros)
}

/// Decode epoch seconds into a calendar timestamp, UTC, no local zone applied.
pub fn decode_epoch_seconds(secs: f64) -> Option<NaiveDateTime> {
    epoch_seconds_to_micros(secs)
        .and_then(DateTime::from_timestamp_micros)
        .map(|dt| dt.naive_utc())
}

/// Convert a numeric epoch-seconds column into `Timestamp(µs)` without a zone.
/// Nulls stay null; they are expected to be filled before this runs.
pub fn decode_timestamp_column(column: &str, array: &ArrayRef) -> Result<ArrayRef> {
    let decode = |v: f64| {
        epoch_seconds_to_micros(v).ok_or_else(|| CleanError::TimestampRange {
            column: column.to_string(),
            value: v,
        })
    };

    let micros: Vec<Option<i64>> = match array.data_type() {
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map(decode).transpose())
            .collect::<Result<_>>()?,
        DataType::Int64 => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(|s| decode(s as f64)).transpose())
            .collect::<Result<_>>()?,
        other => {
            return Err(CleanError::UnsupportedColumnType {
                column: column.to_string(),
                data_type: other.clone(),
            })
        }
    };

    Ok(Arc::new(TimestampMicrosecondArray::from(micros)) as ArrayRef)
}
