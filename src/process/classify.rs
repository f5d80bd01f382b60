// src/process/classify.rs

use std::fmt;
use tracing::warn;

use crate::error::ColumnClassificationError;

/// Substring marking a current-harmonic channel column.
pub const HI_MARKER: &str = "hi";
/// Substring marking a voltage-harmonic channel column.
pub const HU_MARKER: &str = "hu";

pub const TIMESTAMP: &str = "ts";
pub const EVENT_INDEX: &str = "event_index";
pub const PHASE: &str = "phase";

/// Power, RMS, frequency and distortion columns.
const MEASUREMENT_TOKENS: [&str; 8] = ["N", "P", "S", "THDI", "THDU", "freq", "rms_i", "rms_u"];

/// Trigger description columns, one distinct value per recorded event.
const PARAMETER_TOKENS: [&str; 4] = ["date", "event_count", "trigger_param", "trigger_value"];

/// The four tables a raw measurement table is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalTable {
    Hi,
    Hu,
    Parameter,
    Other,
}

impl LogicalTable {
    pub const ALL: [LogicalTable; 4] = [
        LogicalTable::Hi,
        LogicalTable::Hu,
        LogicalTable::Parameter,
        LogicalTable::Other,
    ];

    /// Directory name under `data/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            LogicalTable::Hi => "hi",
            LogicalTable::Hu => "hu",
            LogicalTable::Parameter => "parameter",
            LogicalTable::Other => "other",
        }
    }

    /// HI and HU carry numbered channels and get a reconstructed header.
    pub fn is_channel_table(self) -> bool {
        matches!(self, LogicalTable::Hi | LogicalTable::Hu)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LogicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What a column name says about the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    HiChannel,
    HuChannel,
    Measurement,
    Parameter,
    Timestamp,
    /// `event_index` or `phase`: the keys joining the tables back together.
    EventKey,
}

impl ColumnRole {
    /// Tables that receive a column with this role.
    pub fn tables(self) -> &'static [LogicalTable] {
        use LogicalTable::*;
        match self {
            ColumnRole::HiChannel => &[Hi],
            ColumnRole::HuChannel => &[Hu],
            ColumnRole::Measurement => &[Other],
            ColumnRole::Parameter => &[Parameter],
            ColumnRole::Timestamp => &[Hi, Hu, Other],
            ColumnRole::EventKey => &[Hi, Hu, Parameter, Other],
        }
    }
}

/// Classify one column name. Rules are tried in order; the first match wins.
pub fn classify_column(name: &str) -> Result<ColumnRole, ColumnClassificationError> {
    let role = if name.contains(HI_MARKER) {
        ColumnRole::HiChannel
    } else if name.contains(HU_MARKER) {
        ColumnRole::HuChannel
    } else if MEASUREMENT_TOKENS.iter().any(|t| name.contains(t)) {
        ColumnRole::Measurement
    } else if PARAMETER_TOKENS.iter().any(|t| name.contains(t)) {
        ColumnRole::Parameter
    } else if name == TIMESTAMP {
        ColumnRole::Timestamp
    } else if name == EVENT_INDEX || name == PHASE {
        ColumnRole::EventKey
    } else {
        return Err(ColumnClassificationError {
            column: name.to_string(),
        });
    };
    Ok(role)
}

/// Column names per logical table, each in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnGroups {
    groups: [Vec<String>; 4],
}

impl ColumnGroups {
    pub fn get(&self, table: LogicalTable) -> &[String] {
        &self.groups[table.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalTable, &[String])> {
        LogicalTable::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    fn push(&mut self, table: LogicalTable, column: &str) {
        self.groups[table.index()].push(column.to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub groups: ColumnGroups,
    /// Columns left out of every table.
    pub unassigned: Vec<ColumnClassificationError>,
}

/// Split the raw column names into the four logical tables.
///
/// Unassignable names are reported and skipped; they never abort the run.
pub fn classify_columns<I, S>(names: I) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Classification::default();
    for name in names {
        let name = name.as_ref();
        match classify_column(name) {
            Ok(role) => {
                for &table in role.tables() {
                    out.groups.push(table, name);
                }
            }
            Err(e) => {
                warn!(column = %name, "{}", e);
                out.unassigned.push(e);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_example_table_split() {
        let c = classify_columns(["ts", "phase", "event_index", "hi01", "hi02", "hu01", "P1"]);

        assert!(c.unassigned.is_empty());
        assert_eq!(
            c.groups.get(LogicalTable::Hi),
            names(&["ts", "phase", "event_index", "hi01", "hi02"]).as_slice()
        );
        assert_eq!(
            c.groups.get(LogicalTable::Hu),
            names(&["ts", "phase", "event_index", "hu01"]).as_slice()
        );
        assert_eq!(
            c.groups.get(LogicalTable::Other),
            names(&["ts", "phase", "event_index", "P1"]).as_slice()
        );
        assert_eq!(
            c.groups.get(LogicalTable::Parameter),
            names(&["phase", "event_index"]).as_slice()
        );
    }

    #[test]
    fn test_structural_columns_are_shared() {
        let all = [
            "event_index", "phase", "ts", "hi1", "hu1", "S", "N", "THDI", "THDU", "freq",
            "rms_i1", "rms_u2", "date", "event_count", "trigger_param", "trigger_value",
        ];
        let c = classify_columns(all);
        assert!(c.unassigned.is_empty());

        for name in all {
            let member_of: Vec<LogicalTable> = c
                .groups
                .iter()
                .filter(|(_, cols)| cols.iter().any(|c| c == name))
                .map(|(t, _)| t)
                .collect();
            let expected = match name {
                "ts" => vec![LogicalTable::Hi, LogicalTable::Hu, LogicalTable::Other],
                "event_index" | "phase" => LogicalTable::ALL.to_vec(),
                _ => {
                    assert_eq!(member_of.len(), 1, "{} should be in one table", name);
                    continue;
                }
            };
            assert_eq!(member_of, expected, "membership of {}", name);
        }
    }

    #[test]
    fn test_rule_precedence() {
        // the channel markers are checked before any other token
        assert_eq!(classify_column("hiP"), Ok(ColumnRole::HiChannel));
        assert_eq!(classify_column("hu_date"), Ok(ColumnRole::HuChannel));
        assert_eq!(classify_column("thiu"), Ok(ColumnRole::HiChannel));
        // measurement tokens beat parameter tokens
        assert_eq!(classify_column("Sdate"), Ok(ColumnRole::Measurement));
        assert_eq!(classify_column("trigger_value"), Ok(ColumnRole::Parameter));
        assert_eq!(classify_column("freq"), Ok(ColumnRole::Measurement));
    }

    #[test]
    fn test_unassignable_column_is_reported() {
        let c = classify_columns(["ts", "voltage", "phase"]);
        assert_eq!(
            c.unassigned,
            vec![ColumnClassificationError {
                column: "voltage".into()
            }]
        );
        for (_, cols) in c.groups.iter() {
            assert!(!cols.iter().any(|c| c == "voltage"));
        }
        // structural markers only match by full name
        assert!(classify_column("tss").is_err());
        assert!(classify_column("event_index2").is_err());
    }
}
