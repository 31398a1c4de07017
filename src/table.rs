//! The materialized result: named, typed columns of equal length.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;

/// A columnar table. Column order matches the source sheet left-to-right,
/// with omitted and empty columns already removed.
#[derive(Debug, Clone)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<ArrayRef>,
}

impl Table {
    pub(crate) fn new(names: Vec<String>, columns: Vec<ArrayRef>) -> Self {
        debug_assert_eq!(names.len(), columns.len());
        if let Some(first) = columns.first() {
            debug_assert!(columns.iter().all(|c| c.len() == first.len()));
        }
        Table { names, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[ArrayRef] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ArrayRef> {
        self.columns.get(index)
    }

    /// First column with this exact name (names are not deduplicated).
    pub fn column_by_name(&self, name: &str) -> Option<&ArrayRef> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.columns.get(i))
    }

    pub fn schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .names
            .iter()
            .zip(&self.columns)
            .map(|(name, column)| Field::new(name, column.data_type().clone(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Hand the table to Arrow as a single record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Ok(RecordBatch::try_new(self.schema(), self.columns.clone())?)
    }

    /// Write the table to a Parquet file.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let batch = self.to_record_batch()?;
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| crate::error::SheetcastError::format(format!("parquet: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| crate::error::SheetcastError::format(format!("parquet: {e}")))?;
        writer
            .close()
            .map_err(|e| crate::error::SheetcastError::format(format!("parquet: {e}")))?;
        Ok(())
    }
}
