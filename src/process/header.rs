// src/process/header.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{CleanError, Result};
use crate::process::classify::{LogicalTable, EVENT_INDEX, PHASE, TIMESTAMP};
use crate::table::PartitionedTable;

/// Length of the role prefix (`hi` / `hu`) in front of a channel number.
const CHANNEL_PREFIX_LEN: usize = 2;

/// One entry of a canonical channel-table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    Phase,
    EventIndex,
    Timestamp,
    Channel(u32),
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderKey::Phase => f.write_str(PHASE),
            HeaderKey::EventIndex => f.write_str(EVENT_INDEX),
            HeaderKey::Timestamp => f.write_str(TIMESTAMP),
            HeaderKey::Channel(n) => write!(f, "{}", n),
        }
    }
}

/// Renaming and column order for a HI or HU table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedHeader {
    /// Source column → channel number.
    pub renames: BTreeMap<String, u32>,
    /// `phase, event_index, ts`, then channels ascending.
    pub order: Vec<HeaderKey>,
}

impl ReconstructedHeader {
    /// Output column names, channel numbers in text form.
    pub fn column_names(&self) -> Vec<String> {
        self.order.iter().map(HeaderKey::to_string).collect()
    }

    /// Rename the channel columns of `data`, then select and reorder by `order`.
    /// A header entry without a matching column is a schema mismatch.
    pub fn apply(&self, table: LogicalTable, data: &PartitionedTable) -> Result<PartitionedTable> {
        let renames: HashMap<String, String> = self
            .renames
            .iter()
            .map(|(old, n)| (old.clone(), n.to_string()))
            .collect();

        data.rename(&renames)?
            .select(&self.column_names())
            .map_err(|e| match e {
                CleanError::MissingColumn { column } => CleanError::SchemaMismatch { table, column },
                other => other,
            })
    }
}

/// Derive the canonical header for the columns of a HI or HU table.
///
/// Every column other than the structural markers must be a 2-character prefix
/// followed by a base-10 channel number.
pub fn reconstruct_header(table: LogicalTable, columns: &[String]) -> Result<ReconstructedHeader> {
    let mut renames = BTreeMap::new();
    let mut by_channel: HashMap<u32, &str> = HashMap::new();

    for column in columns {
        if is_structural(column) {
            continue;
        }
        let channel = column
            .get(CHANNEL_PREFIX_LEN..)
            .and_then(|suffix| suffix.parse::<u32>().ok())
            .ok_or_else(|| CleanError::ChannelNameFormat {
                table,
                column: column.clone(),
            })?;

        if let Some(first) = by_channel.insert(channel, column.as_str()) {
            return Err(CleanError::DuplicateChannel {
                table,
                channel,
                first: first.to_string(),
                second: column.clone(),
            });
        }
        renames.insert(column.clone(), channel);
    }

    let mut channels: Vec<u32> = renames.values().copied().collect();
    channels.sort_unstable();

    let mut order = Vec::with_capacity(channels.len() + 3);
    order.extend([HeaderKey::Phase, HeaderKey::EventIndex, HeaderKey::Timestamp]);
    order.extend(channels.into_iter().map(HeaderKey::Channel));

    Ok(ReconstructedHeader { renames, order })
}

fn is_structural(column: &str) -> bool {
    column == TIMESTAMP || column == EVENT_INDEX || column == PHASE
}
