//! CSV record writer.
//!
//! One header row, then one row per tick:
//!
//! ```text
//! seconds,microseconds,<name1>,<name2>,...
//! <secs>,<usecs>,<val1>,<val2>,...
//! ```
//!
//! Values are fixed-point with three decimals. Every row is flushed as soon as it is
//! written so a live consumer sees it immediately.

use crate::error::{AdreadError, AppResult};
use crate::timestamp::Timestamp;
use std::io::Write;

/// Leading columns of every row.
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["seconds", "microseconds"];

/// Digits after the decimal point for calibrated values.
pub const VALUE_PRECISION: usize = 3;

/// Streaming CSV writer over any byte sink.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: Option<usize>,
    rows: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap a sink.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(false).from_writer(sink),
            columns: None,
            rows: 0,
        }
    }

    /// Write the header row. Must be called exactly once, before any record.
    pub fn write_header<S: AsRef<str>>(&mut self, names: &[S]) -> AppResult<()> {
        if self.columns.is_some() {
            return Err(AdreadError::Record("header already written".to_string()));
        }
        let row: Vec<&str> = TIMESTAMP_COLUMNS
            .iter()
            .copied()
            .chain(names.iter().map(AsRef::as_ref))
            .collect();
        self.write_row(&row)?;
        self.columns = Some(row.len());
        Ok(())
    }

    /// Write one data row.
    pub fn write_record(&mut self, timestamp: Timestamp, values: &[f64]) -> AppResult<()> {
        let expected = self
            .columns
            .ok_or_else(|| AdreadError::Record("record written before header".to_string()))?;
        if values.len() + TIMESTAMP_COLUMNS.len() != expected {
            return Err(AdreadError::Record(format!(
                "record has {} values, header has {} channels",
                values.len(),
                expected - TIMESTAMP_COLUMNS.len()
            )));
        }

        let mut row = Vec::with_capacity(expected);
        row.push(timestamp.seconds.to_string());
        row.push(timestamp.microseconds.to_string());
        row.extend(values.iter().map(|v| format_value(*v)));
        self.write_row(&row)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Recover the underlying sink.
    pub fn into_inner(self) -> AppResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| AdreadError::Sink(e.error().to_string()))
    }

    fn write_row<T: AsRef<[u8]>>(&mut self, row: &[T]) -> AppResult<()> {
        self.writer.write_record(row)?;
        self.writer
            .flush()
            .map_err(|e| AdreadError::Sink(e.to_string()))
    }
}

/// Render a calibrated value with [`VALUE_PRECISION`] decimals.
pub fn format_value(value: f64) -> String {
    format!("{:.*}", VALUE_PRECISION, value)
}
