//! Writing tables and typed sales rows.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;
use tracing::debug;

use tally_core::schema::{SalesRecord, SALES_TABLE};
use tally_core::table::{MemTable, TableSchema};
use tally_core::value::{DataType, Value};

use crate::client::{data_type_for_column, validate_ident, PostgresClient};
use crate::errors::{PostgresError, Result};

/// Rows per INSERT statement when writing a table.
const INSERT_BATCH_ROWS: usize = 500;

const INSERT_SALE_SQL: &str = "insert into sales \
     (sale_date, product_id, product_name, quantity, unit_price, customer_id, region) \
     values ($1, $2, $3, $4, $5::float8, $6, $7)";

/// How a write treats an existing destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Error if the table already exists.
    #[default]
    Fail,
    /// Drop and recreate the table.
    Replace,
    /// Insert into the existing table; its schema must match.
    Append,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Fail => "fail",
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = PostgresError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(WriteMode::Fail),
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            other => Err(PostgresError::UnknownWriteMode(other.to_string())),
        }
    }
}

impl PostgresClient {
    /// Write an in-memory table, honoring the write mode.
    ///
    /// The whole write runs in one transaction: if any statement fails the
    /// destination is left exactly as it was. Returns the number of rows
    /// written.
    pub async fn write_table(
        &mut self,
        table: &str,
        data: &MemTable,
        mode: WriteMode,
    ) -> Result<u64> {
        let table = validate_ident(table)?.to_string();
        for field in data.schema().fields() {
            validate_ident(&field.name)?;
        }

        let exists = self.table_exists(&table).await?;
        match (mode, exists) {
            (WriteMode::Fail, true) => return Err(PostgresError::TableExists(table)),
            (WriteMode::Append, true) => {
                self.check_append_compatible(&table, data.schema()).await?
            }
            _ => (),
        }

        // Dropping the transaction without committing rolls it back.
        let tx = self.client.transaction().await?;
        if mode == WriteMode::Replace && exists {
            tx.execute(&format!("drop table \"{table}\""), &[]).await?;
        }
        if !exists || mode == WriteMode::Replace {
            tx.execute(&create_table_sql(&table, data.schema()), &[])
                .await?;
        }

        let mut written = 0u64;
        for chunk in data.rows().chunks(INSERT_BATCH_ROWS) {
            written += insert_chunk(&tx, &table, data.schema(), chunk).await?;
        }
        tx.commit().await?;

        debug!(table = %table, rows = written, mode = %mode, "wrote table");
        Ok(written)
    }

    /// Append sales rows in a single transaction.
    ///
    /// Ids on the records are ignored; the sequence assigns new ones. Any
    /// failure, e.g. a CHECK constraint violation on one row, rolls the
    /// whole batch back.
    pub async fn append_sales_atomic(&mut self, records: &[SalesRecord]) -> Result<u64> {
        let tx = self.client.transaction().await?;
        let inserted = insert_sales(&tx, records).await?;
        tx.commit().await?;

        debug!(rows = inserted, "appended sales rows");
        Ok(inserted)
    }

    /// Write typed sales rows, honoring the write mode against the live
    /// table.
    ///
    /// The sales table owns its schema (generated ids, checks, the customer
    /// foreign key), so no mode touches the DDL: `Replace` clears the
    /// existing rows in the same transaction as the insert, `Append` adds to
    /// them, and `Fail` errors when the table already exists.
    pub async fn write_sales(&mut self, records: &[SalesRecord], mode: WriteMode) -> Result<u64> {
        match mode {
            WriteMode::Fail => {
                if self.table_exists(SALES_TABLE).await? {
                    return Err(PostgresError::TableExists(SALES_TABLE.to_string()));
                }
                self.append_sales_atomic(records).await
            }
            WriteMode::Append => self.append_sales_atomic(records).await,
            WriteMode::Replace => {
                let tx = self.client.transaction().await?;
                tx.execute("delete from sales", &[]).await?;
                let written = insert_sales(&tx, records).await?;
                tx.commit().await?;

                debug!(rows = written, "replaced sales rows");
                Ok(written)
            }
        }
    }

    async fn check_append_compatible(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let existing = self.table_columns(table).await?;
        if existing.len() != schema.num_fields() {
            return Err(PostgresError::SchemaMismatch {
                table: table.to_string(),
                detail: format!(
                    "table has {} columns, data has {}",
                    existing.len(),
                    schema.num_fields()
                ),
            });
        }
        for (have, want) in existing.iter().zip(schema.fields()) {
            if have.name != want.name {
                return Err(PostgresError::SchemaMismatch {
                    table: table.to_string(),
                    detail: format!("expected column '{}', table has '{}'", want.name, have.name),
                });
            }
            let have_type = data_type_for_column(have)?;
            if have_type != want.data_type {
                return Err(PostgresError::SchemaMismatch {
                    table: table.to_string(),
                    detail: format!(
                        "column '{}' is {have_type}, data is {}",
                        want.name, want.data_type
                    ),
                });
            }
        }
        Ok(())
    }
}

async fn insert_sales(tx: &Transaction<'_>, records: &[SalesRecord]) -> Result<u64> {
    let mut inserted = 0u64;
    for rec in records {
        inserted += tx
            .execute(
                INSERT_SALE_SQL,
                &[
                    &rec.sale_date,
                    &rec.product_id,
                    &rec.product_name,
                    &rec.quantity,
                    &rec.unit_price,
                    &rec.customer_id,
                    &rec.region,
                ],
            )
            .await?;
    }
    Ok(inserted)
}

fn ddl_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bool => "boolean",
        DataType::Int32 => "integer",
        DataType::Int64 => "bigint",
        DataType::Float64 => "double precision",
        DataType::Utf8 => "text",
        DataType::Date => "date",
    }
}

fn create_table_sql(table: &str, schema: &TableSchema) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let not_null = if field.nullable { "" } else { " not null" };
            format!("\"{}\" {}{}", field.name, ddl_type(field.data_type), not_null)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("create table \"{table}\" ({columns})")
}

fn insert_sql(table: &str, schema: &TableSchema, num_rows: usize) -> String {
    let num_cols = schema.num_fields();
    let columns = schema
        .fields()
        .iter()
        .map(|field| format!("\"{}\"", field.name))
        .collect::<Vec<_>>()
        .join(", ");
    let tuples = (0..num_rows)
        .map(|row| {
            let placeholders = (1..=num_cols)
                .map(|col| format!("${}", row * num_cols + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("insert into \"{table}\" ({columns}) values {tuples}")
}

async fn insert_chunk(
    tx: &Transaction<'_>,
    table: &str,
    schema: &TableSchema,
    rows: &[Vec<Value>],
) -> Result<u64> {
    let sql = insert_sql(table, schema, rows.len());
    let mut params: Vec<&(dyn ToSql + Sync)> =
        Vec::with_capacity(rows.len() * schema.num_fields());
    for row in rows {
        for (value, field) in row.iter().zip(schema.fields()) {
            params.push(bind_value(value, field.data_type));
        }
    }
    Ok(tx.execute(&sql, &params).await?)
}

static NULL_BOOL: Option<bool> = None;
static NULL_INT32: Option<i32> = None;
static NULL_INT64: Option<i64> = None;
static NULL_FLOAT64: Option<f64> = None;
static NULL_UTF8: Option<&str> = None;
static NULL_DATE: Option<NaiveDate> = None;

/// Bind a value as a SQL parameter. Nulls bind through the column's type so
/// the server sees a correctly typed parameter.
fn bind_value(value: &Value, data_type: DataType) -> &(dyn ToSql + Sync) {
    match value {
        Value::Null => match data_type {
            DataType::Bool => &NULL_BOOL,
            DataType::Int32 => &NULL_INT32,
            DataType::Int64 => &NULL_INT64,
            DataType::Float64 => &NULL_FLOAT64,
            DataType::Utf8 => &NULL_UTF8,
            DataType::Date => &NULL_DATE,
        },
        Value::Bool(v) => v,
        Value::Int32(v) => v,
        Value::Int64(v) => v,
        Value::Float64(v) => v,
        Value::Utf8(v) => v,
        Value::Date(v) => v,
    }
}
