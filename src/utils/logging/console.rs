//! Console output utilities
//!
//! Formatted printing of dataset summaries, used by `describe`.

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde_json::Value;

use crate::error::Result;

/// Print a section heading
pub fn print_heading(title: &str) {
    println!();
    println!("== {title} ==");
}

/// Print column names with their Arrow types and nullability
pub fn print_schema_info(batch: &RecordBatch) {
    for field in batch.schema().fields() {
        let nullable = if field.is_nullable() { "" } else { ", required" };
        println!("  - {}: {}{}", field.name(), field.data_type(), nullable);
    }
}

/// Print the first rows of a batch as a table
pub fn print_sample_rows(batch: &RecordBatch, num_rows: usize) -> Result<()> {
    let sample = batch.slice(0, num_rows.min(batch.num_rows()));
    println!("{}", pretty_format_batches(&[sample])?);
    Ok(())
}

/// Print a JSON value indented below a heading
pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
