// src/table/mod.rs

pub mod load;

use arrow::array::UInt32Array;
use arrow::compute::{concat_batches, take_record_batch};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{CleanError, Result};

pub use load::{load_table, resolve_sources};

/// A table held as a list of row partitions sharing one schema.
///
/// Partition-local work (`map_partitions`) runs on the current rayon pool.
#[derive(Debug, Clone)]
pub struct PartitionedTable {
    schema: SchemaRef,
    partitions: Vec<RecordBatch>,
}

impl PartitionedTable {
    pub fn try_new(schema: SchemaRef, partitions: Vec<RecordBatch>) -> Result<Self> {
        if let Some(bad) = partitions
            .iter()
            .find(|b| b.schema().fields() != schema.fields())
        {
            return Err(ArrowError::SchemaError(format!(
                "partition schema {:?} does not match table schema {:?}",
                bad.schema().fields(),
                schema.fields()
            ))
            .into());
        }
        Ok(Self { schema, partitions })
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            partitions: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    pub fn partitions(&self) -> &[RecordBatch] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(RecordBatch::num_rows).sum()
    }

    /// Apply `f` to every partition in parallel. The first failing partition
    /// aborts the whole map.
    pub fn map_partitions<F>(self, f: F) -> Result<Self>
    where
        F: Fn(&RecordBatch) -> Result<RecordBatch> + Sync + Send,
    {
        let partitions: Vec<RecordBatch> = self.partitions.par_iter().map(&f).collect::<Result<_>>()?;
        let schema = match partitions.first() {
            Some(b) => b.schema(),
            // nothing to map; probe the schema with an empty batch
            None => f(&RecordBatch::new_empty(self.schema.clone()))?.schema(),
        };
        Self::try_new(schema, partitions)
    }

    /// Project onto `columns`, in that order.
    pub fn select(&self, columns: &[String]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|c| {
                self.schema
                    .index_of(c)
                    .map_err(|_| CleanError::MissingColumn { column: c.clone() })
            })
            .collect::<Result<Vec<usize>>>()?;

        let schema = Arc::new(self.schema.project(&indices)?);
        let partitions = self
            .partitions
            .iter()
            .map(|b| b.project(&indices))
            .collect::<Result<Vec<_>, ArrowError>>()?;
        Self::try_new(schema, partitions)
    }

    /// Rename columns found in `renames`; other columns keep their names.
    pub fn rename(&self, renames: &HashMap<String, String>) -> Result<Self> {
        let fields: Vec<_> = self
            .schema
            .fields()
            .iter()
            .map(|f| match renames.get(f.name()) {
                Some(new) => f.as_ref().clone().with_name(new),
                None => f.as_ref().clone(),
            })
            .collect();
        let schema = Arc::new(Schema::new_with_metadata(fields, self.schema.metadata().clone()));

        let partitions = self
            .partitions
            .iter()
            .map(|b| RecordBatch::try_new(schema.clone(), b.columns().to_vec()))
            .collect::<Result<Vec<_>, ArrowError>>()?;
        Self::try_new(schema, partitions)
    }

    /// Drop rows equal (over all columns) to an earlier row. Keeps the first
    /// occurrence and the original order; the result is a single partition.
    pub fn drop_duplicates(&self) -> Result<Self> {
        let combined = concat_batches(&self.schema, &self.partitions)?;

        let converter = RowConverter::new(
            self.schema
                .fields()
                .iter()
                .map(|f| SortField::new(f.data_type().clone()))
                .collect(),
        )?;
        let rows = converter.convert_columns(combined.columns())?;

        let mut seen = HashSet::with_capacity(rows.num_rows());
        let keep: UInt32Array = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| seen.insert(*row))
            .map(|(i, _)| i as u32)
            .collect();

        let deduped = take_record_batch(&combined, &keep)?;
        Self::try_new(self.schema.clone(), vec![deduped])
    }

    /// Coalesce neighbouring partitions into `n` partitions (at least one).
    /// Never splits partitions, so asking for more than exist is a no-op.
    pub fn repartition(&self, n: usize) -> Result<Self> {
        let n = n.max(1);
        let current = self.partitions.len();
        if current == 0 {
            return Self::try_new(
                self.schema.clone(),
                vec![RecordBatch::new_empty(self.schema.clone())],
            );
        }
        if n >= current {
            return Ok(self.clone());
        }

        let partitions = (0..n)
            .map(|i| {
                let start = i * current / n;
                let end = (i + 1) * current / n;
                concat_batches(&self.schema, &self.partitions[start..end])
            })
            .collect::<Result<Vec<_>, ArrowError>>()?;
        Self::try_new(self.schema.clone(), partitions)
    }
}
