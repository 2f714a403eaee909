//! Reading whole tables, chunked scans and typed record fetches.

use chrono::NaiveDate;
use tokio_postgres::Row;

use tally_core::schema::{CustomerRecord, SalesRecord};
use tally_core::table::{Field, MemTable, TableSchema};
use tally_core::value::{DataType, Value};

use crate::client::{data_type_for_column, validate_ident, PgColumn, PostgresClient};
use crate::errors::Result;

// Numeric columns are cast in the select list so every float arrives as
// float8; the aliases keep the reported column names stable.
const SALES_SELECT: &str = "select id, sale_date, product_id, product_name, quantity, \
     unit_price::float8 as unit_price, customer_id, region from sales";

const CUSTOMERS_SELECT: &str = "select customer_id, name, email, signup_date from customers";

impl PostgresClient {
    /// Read a whole table into memory.
    pub async fn read_table(&self, table: &str) -> Result<MemTable> {
        let table = validate_ident(table)?;
        let columns = self.table_columns(table).await?;
        let schema = schema_from_columns(&columns)?;
        let select_list = select_list(&columns)?;

        let rows = self
            .client
            .query(&format!("select {select_list} from \"{table}\""), &[])
            .await?;
        rows_to_table(schema, &rows)
    }

    /// Start a chunked scan over a table, ordered by its primary key (or by
    /// the first column if it has none). Chunks arrive sequentially.
    pub async fn scan_table(&self, table: &str, chunk_size: usize) -> Result<TableScan<'_>> {
        let table = validate_ident(table)?.to_string();
        let columns = self.table_columns(&table).await?;
        let schema = schema_from_columns(&columns)?;
        let select_list = select_list(&columns)?;

        let pk = self.primary_key_columns(&table).await?;
        let order_by = if pk.is_empty() {
            "1".to_string()
        } else {
            pk.iter()
                .map(|col| Ok(format!("\"{}\"", validate_ident(col)?)))
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };

        Ok(TableScan {
            client: self,
            table,
            schema,
            select_list,
            order_by,
            chunk_size: chunk_size.max(1),
            offset: 0,
            done: false,
        })
    }

    /// A contiguous slice of the sales table, ordered by id.
    pub async fn fetch_sales_slice(&self, offset: u64, limit: u64) -> Result<Vec<SalesRecord>> {
        let rows = self
            .client
            .query(
                &format!("{SALES_SELECT} order by id limit $1 offset $2"),
                &[&(limit as i64), &(offset as i64)],
            )
            .await?;
        rows.iter().map(sales_record_from_row).collect()
    }

    /// All customers, ordered by id.
    pub async fn fetch_customers(&self) -> Result<Vec<CustomerRecord>> {
        let rows = self
            .client
            .query(&format!("{CUSTOMERS_SELECT} order by customer_id"), &[])
            .await?;
        rows.iter().map(customer_record_from_row).collect()
    }
}

/// In-progress chunked scan. Each call to [`TableScan::next_chunk`] fetches
/// the next batch of rows.
pub struct TableScan<'a> {
    client: &'a PostgresClient,
    table: String,
    schema: TableSchema,
    select_list: String,
    order_by: String,
    chunk_size: usize,
    offset: usize,
    done: bool,
}

impl TableScan<'_> {
    /// Fetch the next chunk, or `None` once the scan is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<MemTable>> {
        if self.done {
            return Ok(None);
        }

        let sql = format!(
            "select {} from \"{}\" order by {} limit {} offset {}",
            self.select_list, self.table, self.order_by, self.chunk_size, self.offset
        );
        let rows = self.client.client.query(&sql, &[]).await?;
        if rows.is_empty() {
            self.done = true;
            return Ok(None);
        }
        if rows.len() < self.chunk_size {
            self.done = true;
        }
        self.offset += rows.len();

        rows_to_table(self.schema.clone(), &rows).map(Some)
    }
}

fn schema_from_columns(columns: &[PgColumn]) -> Result<TableSchema> {
    let fields = columns
        .iter()
        .map(|col| {
            Ok(Field::new(
                col.name.clone(),
                data_type_for_column(col)?,
                col.nullable,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TableSchema::new(fields))
}

/// Select expressions for the given columns, casting where the stored type
/// is wider or narrower than the logical one.
fn select_list(columns: &[PgColumn]) -> Result<String> {
    let exprs = columns
        .iter()
        .map(|col| {
            let name = validate_ident(&col.name)?;
            Ok(match col.data_type.as_str() {
                "numeric" | "real" => format!("\"{name}\"::float8 as \"{name}\""),
                "smallint" => format!("\"{name}\"::int4 as \"{name}\""),
                _ => format!("\"{name}\""),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(exprs.join(", "))
}

fn rows_to_table(schema: TableSchema, rows: &[Row]) -> Result<MemTable> {
    let column_types: Vec<DataType> = schema.fields().iter().map(|f| f.data_type).collect();
    let mut table = MemTable::new(schema);
    for row in rows {
        let mut values = Vec::with_capacity(column_types.len());
        for (idx, data_type) in column_types.iter().enumerate() {
            values.push(decode_value(row, idx, *data_type)?);
        }
        table.push_row(values)?;
    }
    Ok(table)
}

fn decode_value(row: &Row, idx: usize, data_type: DataType) -> Result<Value> {
    Ok(match data_type {
        DataType::Bool => Value::from(row.try_get::<_, Option<bool>>(idx)?),
        DataType::Int32 => Value::from(row.try_get::<_, Option<i32>>(idx)?),
        DataType::Int64 => Value::from(row.try_get::<_, Option<i64>>(idx)?),
        DataType::Float64 => Value::from(row.try_get::<_, Option<f64>>(idx)?),
        DataType::Utf8 => Value::from(row.try_get::<_, Option<String>>(idx)?),
        DataType::Date => Value::from(row.try_get::<_, Option<NaiveDate>>(idx)?),
    })
}

fn sales_record_from_row(row: &Row) -> Result<SalesRecord> {
    Ok(SalesRecord {
        id: row.try_get("id")?,
        sale_date: row.try_get("sale_date")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        customer_id: row.try_get("customer_id")?,
        region: row.try_get("region")?,
    })
}

fn customer_record_from_row(row: &Row) -> Result<CustomerRecord> {
    Ok(CustomerRecord {
        customer_id: row.try_get("customer_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        signup_date: row.try_get("signup_date")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str, nullable: bool) -> PgColumn {
        PgColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
        }
    }

    #[test]
    fn select_list_casts_numeric_and_smallint() {
        let columns = vec![
            col("id", "integer", false),
            col("price", "numeric", false),
            col("tiny", "smallint", true),
            col("name", "text", false),
        ];
        assert_eq!(
            select_list(&columns).unwrap(),
            "\"id\", \"price\"::float8 as \"price\", \"tiny\"::int4 as \"tiny\", \"name\""
        );
    }

    #[test]
    fn schema_mapping_carries_nullability() {
        let columns = vec![
            col("id", "integer", false),
            col("customer_id", "integer", true),
        ];
        let schema = schema_from_columns(&columns).unwrap();
        assert!(!schema.fields()[0].nullable);
        assert!(schema.fields()[1].nullable);
        assert_eq!(schema.fields()[1].data_type, DataType::Int32);
    }

    #[test]
    fn schema_mapping_rejects_unknown_types() {
        let columns = vec![col("blob", "bytea", true)];
        assert!(schema_from_columns(&columns).is_err());
    }
}
