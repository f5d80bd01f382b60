use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::{debug, warn};

use super::{Column, ValueType};
use crate::process::utils::{clean_str, is_na_token, is_unnamed};

/// Read the header and up to `limit` data rows of a CSV file.
pub fn sample_csv<P: AsRef<Path>>(path: P, limit: usize) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(clean_str)
        .collect();

    let mut rows = Vec::with_capacity(limit.min(1_024));
    for result in rdr.records().take(limit) {
        let record = result.with_context(|| format!("parsing {}", path.display()))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok((headers, rows))
}

/// For each named column, look at every sampled cell:
///  - Ignore empty cells and NA spellings (`NA`, `NaN`, ...)
///  - All integers → Integer, all numbers → Float, anything else → Text
///  - A column without a single sample is Float (it only ever held missing values)
///
/// `Unnamed` index columns are skipped.
pub fn derive_types(header_names: &[String], sample_rows: &[Vec<String>]) -> Result<Vec<Column>> {
    if header_names.is_empty() {
        return Err(anyhow!("derive_types: no headers"));
    }

    if sample_rows.iter().any(|r| r.len() > header_names.len()) {
        warn!(
            "derive_types: some rows have more cells than headers ({} headers)",
            header_names.len()
        );
    }

    let mut cols = Vec::with_capacity(header_names.len());

    for (idx, name) in header_names.iter().enumerate() {
        if is_unnamed(name) {
            debug!(index = idx, "derive_types: skipping unnamed column");
            continue;
        }

        let mut seen = false;
        let mut ty = ValueType::Integer;
        for row in sample_rows {
            let cell = row.get(idx).map(|s| s.trim()).unwrap_or("");
            if is_na_token(cell) {
                continue;
            }
            seen = true;
            ty = widen(ty, infer_type(cell));
            if ty == ValueType::Text {
                break;
            }
        }

        if !seen {
            debug!(column = %name, "derive_types: no samples, defaulting to float");
            ty = ValueType::Float;
        }
        cols.push(Column::new(name.clone(), ty));
    }

    Ok(cols)
}

fn infer_type(cell: &str) -> ValueType {
    if cell.parse::<i64>().is_ok() {
        ValueType::Integer
    } else if cell.parse::<f64>().is_ok() {
        ValueType::Float
    } else {
        ValueType::Text
    }
}

fn widen(current: ValueType, next: ValueType) -> ValueType {
    match (current, next) {
        (ValueType::Text, _) | (_, ValueType::Text) => ValueType::Text,
        (ValueType::Float, _) | (_, ValueType::Float) => ValueType::Float,
        _ => ValueType::Integer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_derive_types() {
        let headers = strings(&["Unnamed: 0", "ts", "event_index", "phase", "hi01", "THDU"]);
        let rows = vec![
            strings(&["0", "1600000000.5", "1", "L1", "", ""]),
            strings(&["1", "1600000001", "2", "L2", "3", ""]),
        ];

        let cols = derive_types(&headers, &rows).unwrap();
        assert_eq!(
            cols,
            vec![
                Column::new("ts", ValueType::Float),
                Column::new("event_index", ValueType::Integer),
                Column::new("phase", ValueType::Text),
                Column::new("hi01", ValueType::Integer),
                Column::new("THDU", ValueType::Float),
            ]
        );
    }

    #[test]
    fn test_na_cells_do_not_widen_to_text() {
        let headers = strings(&["P1", "event_count"]);
        let rows = vec![strings(&["NaN", "NA"]), strings(&["2.5", "4"]), strings(&["NA", "null"])];

        let cols = derive_types(&headers, &rows).unwrap();
        assert_eq!(
            cols,
            vec![
                Column::new("P1", ValueType::Float),
                Column::new("event_count", ValueType::Integer),
            ]
        );
    }

    #[test]
    fn test_derive_types_requires_headers() {
        assert!(derive_types(&[], &[]).is_err());
    }

    #[test]
    fn test_sample_csv_limits_rows() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "ts,\"phase\"\n1.0,L1\n2.0,L2\n3.0,L3").unwrap();

        let (headers, rows) = sample_csv(tmp.path(), 2).unwrap();
        assert_eq!(headers, strings(&["ts", "phase"]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], strings(&["2.0", "L2"]));
    }
}
