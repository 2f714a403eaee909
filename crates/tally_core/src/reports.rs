//! Typed report rows.
//!
//! Each report is defined once here, field-for-field what the SQL pushdown
//! returns, and every backend produces exactly these types with the same
//! deterministic ordering.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{CoreError, Result};
use crate::table::{Field, MemTable, TableSchema};
use crate::value::{DataType, Value};

/// Product names counted as electronics; everything else is an accessory.
pub const ELECTRONICS_PRODUCTS: &[&str] = &["Laptop", "Monitor", "Smartphone", "Tablet"];

pub const CATEGORY_ELECTRONICS: &str = "Electronics";
pub const CATEGORY_ACCESSORIES: &str = "Accessories";

/// The one category derivation. The SQL backends inline the equivalent CASE
/// expression; both are driven by [`ELECTRONICS_PRODUCTS`].
pub fn category_for_product(product_name: &str) -> &'static str {
    if ELECTRONICS_PRODUCTS.contains(&product_name) {
        CATEGORY_ELECTRONICS
    } else {
        CATEGORY_ACCESSORIES
    }
}

/// Revenue per product, ordered by `total_revenue` DESC, `product_id` ASC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_id: i32,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

/// Totals per derived category, ordered by `total_revenue` DESC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub order_count: i64,
    pub total_quantity: i64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
}

/// Region x category matrix, ordered by `region` ASC, `category` ASC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalSummary {
    pub region: String,
    pub category: String,
    pub order_count: i64,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

/// Revenue per calendar month, ordered by month ASC. `month` is the first
/// day of the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: NaiveDate,
    pub order_count: i64,
    pub total_revenue: f64,
}

/// Per-customer order totals from the inner join of sales and customers,
/// ordered by `total_spent` DESC, `customer_id` ASC. Sales without a
/// customer and customers without sales do not appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerOrderStats {
    pub customer_id: i32,
    pub name: String,
    pub order_count: i64,
    pub total_spent: f64,
}

/// The derived product catalog, ordered by `product_id` ASC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub product_id: i32,
    pub product_name: String,
    pub category: String,
}

/// Report selector, used by configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ProductRevenue,
    CategorySummary,
    RegionalSummary,
    MonthlyRevenue,
    CustomerStats,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::ProductRevenue,
        ReportKind::CategorySummary,
        ReportKind::RegionalSummary,
        ReportKind::MonthlyRevenue,
        ReportKind::CustomerStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ProductRevenue => "product-revenue",
            ReportKind::CategorySummary => "category-summary",
            ReportKind::RegionalSummary => "regional-summary",
            ReportKind::MonthlyRevenue => "monthly-revenue",
            ReportKind::CustomerStats => "customer-stats",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownReport(s.to_string()))
    }
}

/// Conversion of report rows into a generic table, for rendering and for
/// writing derived tables back to the database.
pub trait ReportTable {
    fn table_schema() -> TableSchema;
    fn to_row(&self) -> Vec<Value>;
}

pub fn to_mem_table<R: ReportTable>(rows: &[R]) -> Result<MemTable> {
    let mut table = MemTable::new(R::table_schema());
    for row in rows {
        table.push_row(row.to_row())?;
    }
    Ok(table)
}

impl ReportTable for ProductRevenue {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("product_id", DataType::Int32, false),
            Field::new("product_name", DataType::Utf8, false),
            Field::new("total_quantity", DataType::Int64, false),
            Field::new("total_revenue", DataType::Float64, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int32(self.product_id),
            Value::Utf8(self.product_name.clone()),
            Value::Int64(self.total_quantity),
            Value::Float64(self.total_revenue),
        ]
    }
}

impl ReportTable for CategorySummary {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("category", DataType::Utf8, false),
            Field::new("order_count", DataType::Int64, false),
            Field::new("total_quantity", DataType::Int64, false),
            Field::new("total_revenue", DataType::Float64, false),
            Field::new("avg_order_value", DataType::Float64, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Utf8(self.category.clone()),
            Value::Int64(self.order_count),
            Value::Int64(self.total_quantity),
            Value::Float64(self.total_revenue),
            Value::Float64(self.avg_order_value),
        ]
    }
}

impl ReportTable for RegionalSummary {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("order_count", DataType::Int64, false),
            Field::new("total_quantity", DataType::Int64, false),
            Field::new("total_revenue", DataType::Float64, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Utf8(self.region.clone()),
            Value::Utf8(self.category.clone()),
            Value::Int64(self.order_count),
            Value::Int64(self.total_quantity),
            Value::Float64(self.total_revenue),
        ]
    }
}

impl ReportTable for MonthlyRevenue {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("month", DataType::Date, false),
            Field::new("order_count", DataType::Int64, false),
            Field::new("total_revenue", DataType::Float64, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Date(self.month),
            Value::Int64(self.order_count),
            Value::Float64(self.total_revenue),
        ]
    }
}

impl ReportTable for CustomerOrderStats {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("customer_id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("order_count", DataType::Int64, false),
            Field::new("total_spent", DataType::Float64, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int32(self.customer_id),
            Value::Utf8(self.name.clone()),
            Value::Int64(self.order_count),
            Value::Float64(self.total_spent),
        ]
    }
}

impl ReportTable for ProductRecord {
    fn table_schema() -> TableSchema {
        TableSchema::new(vec![
            Field::new("product_id", DataType::Int32, false),
            Field::new("product_name", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
        ])
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Int32(self.product_id),
            Value::Utf8(self.product_name.clone()),
            Value::Utf8(self.category.clone()),
        ]
    }
}
