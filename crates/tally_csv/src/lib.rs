//! CSV ingest for sales data.
//!
//! The typed path parses rows straight into [`SalesRecord`]s; the generic
//! path reads any CSV into an all-text table for ad hoc loads.

pub mod errors;

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use tally_core::schema::SalesRecord;
use tally_core::table::{Field, MemTable, TableSchema};
use tally_core::value::{DataType, Value};

use crate::errors::Result;

/// One data row of a sales CSV export. There is no id column; ids are
/// assigned by the destination.
#[derive(Debug, Deserialize)]
struct SalesCsvRow {
    sale_date: NaiveDate,
    product_id: i32,
    product_name: String,
    quantity: i32,
    unit_price: f64,
    customer_id: Option<i32>,
    region: String,
}

/// Read a sales CSV into typed records, assigning sequential ids starting
/// at 1.
///
/// Expects a header row; `customer_id` may be empty. Parse failures name the
/// offending line.
pub fn read_sales_records(path: impl AsRef<Path>) -> Result<Vec<SalesRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<SalesCsvRow>().enumerate() {
        let row = row?;
        records.push(SalesRecord {
            id: idx as i32 + 1,
            sale_date: row.sale_date,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            customer_id: row.customer_id,
            region: row.region,
        });
    }

    debug!(path = %path.display(), rows = records.len(), "read sales csv");
    Ok(records)
}

/// Read an arbitrary CSV into an all-text table. Column names come from the
/// header row; empty cells become NULL.
pub fn read_table(path: impl AsRef<Path>) -> Result<MemTable> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let fields = reader
        .headers()?
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let mut table = MemTable::new(TableSchema::new(fields));

    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    Value::Null
                } else {
                    Value::from(cell)
                }
            })
            .collect();
        table.push_row(row)?;
    }

    Ok(table)
}
