//! Typed records and table schemas for the demo relations.

use chrono::NaiveDate;

use crate::errors::Result;
use crate::table::{Field, MemTable, TableSchema};
use crate::value::{DataType, Value};

pub const SALES_TABLE: &str = "sales";
pub const CUSTOMERS_TABLE: &str = "customers";

/// One row of the `sales` relation.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub id: i32,
    pub sale_date: NaiveDate,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    /// Nullable; a sale is not required to reference a known customer.
    pub customer_id: Option<i32>,
    pub region: String,
}

impl SalesRecord {
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// One row of the `customers` relation.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: i32,
    pub name: String,
    pub email: String,
    pub signup_date: NaiveDate,
}

/// Schema of the `sales` table as stored, including the generated id.
pub fn sales_table_schema() -> TableSchema {
    let mut fields = vec![Field::new("id", DataType::Int32, false)];
    fields.extend(sales_import_schema().fields().to_vec());
    TableSchema::new(fields)
}

/// Schema of sales data before ids are assigned, e.g. rows arriving from a
/// CSV export.
pub fn sales_import_schema() -> TableSchema {
    TableSchema::new(vec![
        Field::new("sale_date", DataType::Date, false),
        Field::new("product_id", DataType::Int32, false),
        Field::new("product_name", DataType::Utf8, false),
        Field::new("quantity", DataType::Int32, false),
        Field::new("unit_price", DataType::Float64, false),
        Field::new("customer_id", DataType::Int32, true),
        Field::new("region", DataType::Utf8, false),
    ])
}

pub fn customers_table_schema() -> TableSchema {
    TableSchema::new(vec![
        Field::new("customer_id", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("email", DataType::Utf8, false),
        Field::new("signup_date", DataType::Date, false),
    ])
}

/// Build an id-less table from sales records, suitable for writing to a
/// destination that assigns its own ids.
pub fn sales_import_table(records: &[SalesRecord]) -> Result<MemTable> {
    let mut table = MemTable::new(sales_import_schema());
    for rec in records {
        table.push_row(vec![
            Value::Date(rec.sale_date),
            Value::Int32(rec.product_id),
            Value::Utf8(rec.product_name.clone()),
            Value::Int32(rec.quantity),
            Value::Float64(rec.unit_price),
            Value::from(rec.customer_id),
            Value::Utf8(rec.region.clone()),
        ])?;
    }
    Ok(table)
}

/// Rebuild typed sales records from a table in the stored `sales` shape,
/// e.g. a chunk coming out of a table scan.
///
/// Columns are looked up by name; a missing column or a mis-typed value is
/// an error.
pub fn sales_records_from_table(table: &MemTable) -> Result<Vec<SalesRecord>> {
    let ids = table.column("id")?;
    let dates = table.column("sale_date")?;
    let product_ids = table.column("product_id")?;
    let product_names = table.column("product_name")?;
    let quantities = table.column("quantity")?;
    let unit_prices = table.column("unit_price")?;
    let customer_ids = table.column("customer_id")?;
    let regions = table.column("region")?;

    (0..table.num_rows())
        .map(|row| {
            Ok(SalesRecord {
                id: ids[row].try_as_i32()?,
                sale_date: dates[row].try_as_date()?,
                product_id: product_ids[row].try_as_i32()?,
                product_name: product_names[row].try_as_str()?.to_string(),
                quantity: quantities[row].try_as_i32()?,
                unit_price: unit_prices[row].try_as_f64()?,
                customer_id: match customer_ids[row] {
                    Value::Null => None,
                    v => Some(v.try_as_i32()?),
                },
                region: regions[row].try_as_str()?.to_string(),
            })
        })
        .collect()
}
