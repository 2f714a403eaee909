//! Connection handling and table inspection.

use tokio_postgres::{Client, NoTls};
use tracing::debug;

use tally_core::value::DataType;

use crate::errors::{PostgresError, Result};

/// A single connection to the database.
///
/// The wire connection is driven on a spawned task; dropping the client
/// terminates it.
pub struct PostgresClient {
    pub(crate) client: Client,
}

impl PostgresClient {
    /// Connect with a keyword/value connection string and verify liveness.
    pub async fn connect(conn_str: &str) -> Result<PostgresClient> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls).await?;

        // The connection object performs the actual communication and has to
        // be polled to completion on its own task.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(%err, "postgres connection errored");
            }
        });

        let client = PostgresClient { client };
        client.ping().await?;
        Ok(client)
    }

    /// Cheap liveness check.
    pub async fn ping(&self) -> Result<()> {
        self.client.execute("select 1", &[]).await?;
        Ok(())
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = self
            .client
            .query_one("select to_regclass($1)::text", &[&table])
            .await?;
        Ok(row.try_get::<_, Option<String>>(0)?.is_some())
    }

    pub async fn row_count(&self, table: &str) -> Result<i64> {
        let table = validate_ident(table)?;
        let row = self
            .client
            .query_one(&format!("select count(*) from \"{table}\""), &[])
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Column metadata for a table, in ordinal order.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<PgColumn>> {
        let rows = self
            .client
            .query(
                "select column_name, data_type, is_nullable \
                 from information_schema.columns \
                 where table_schema = 'public' and table_name = $1 \
                 order by ordinal_position",
                &[&table],
            )
            .await?;
        if rows.is_empty() {
            return Err(PostgresError::TableNotFound(table.to_string()));
        }
        rows.iter()
            .map(|row| {
                Ok(PgColumn {
                    name: row.try_get(0)?,
                    data_type: row.try_get(1)?,
                    nullable: row.try_get::<_, String>(2)? == "YES",
                })
            })
            .collect()
    }

    /// Primary key column names, in key order. Empty if the table has no
    /// primary key.
    pub(crate) async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "select a.attname \
                 from pg_index i \
                 join pg_attribute a \
                   on a.attrelid = i.indrelid and a.attnum = any(i.indkey) \
                 where i.indrelid = to_regclass($1) and i.indisprimary \
                 order by array_position(i.indkey::int2[], a.attnum)",
                &[&table],
            )
            .await?;
        rows.iter().map(|row| Ok(row.try_get(0)?)).collect()
    }
}

/// Column description as reported by `information_schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct PgColumn {
    pub name: String,
    /// The `data_type` string, e.g. "integer" or "character varying".
    pub data_type: String,
    pub nullable: bool,
}

/// Map a reported column type to our logical type.
pub(crate) fn data_type_for_column(col: &PgColumn) -> Result<DataType> {
    Ok(match col.data_type.as_str() {
        "boolean" => DataType::Bool,
        "smallint" | "integer" => DataType::Int32,
        "bigint" => DataType::Int64,
        "real" | "double precision" | "numeric" => DataType::Float64,
        "text" | "character varying" | "character" => DataType::Utf8,
        "date" => DataType::Date,
        other => {
            return Err(PostgresError::UnsupportedColumnType {
                column: col.name.clone(),
                data_type: other.to_string(),
            })
        }
    })
}

/// Restrict identifiers that get spliced into statements to the safe
/// alphabet. Data values always travel as bound parameters; identifiers
/// cannot, so they are validated instead.
pub(crate) fn validate_ident(name: &str) -> Result<&str> {
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !starts_ok || !rest_ok || name.len() > 63 {
        return Err(PostgresError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}
