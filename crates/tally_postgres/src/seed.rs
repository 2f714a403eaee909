//! Schema creation and idempotent seeding of the demo tables.

use tracing::debug;

use tally_core::seed::{SEED_CUSTOMERS, SEED_SALES};

use crate::client::PostgresClient;
use crate::errors::Result;

const CREATE_CUSTOMERS_SQL: &str = "\
create table if not exists customers (
    customer_id integer primary key,
    name text not null,
    email text not null,
    signup_date date not null
)";

const CREATE_SALES_SQL: &str = "\
create table if not exists sales (
    id serial primary key,
    sale_date date not null,
    product_id integer not null,
    product_name text not null,
    quantity integer not null check (quantity > 0),
    unit_price numeric(10, 2) not null check (unit_price >= 0),
    customer_id integer references customers (customer_id),
    region text not null
)";

const INSERT_SEED_CUSTOMER_SQL: &str = "\
insert into customers (customer_id, name, email, signup_date)
values ($1, $2, $3, $4)
on conflict (customer_id) do nothing";

const INSERT_SEED_SALE_SQL: &str = "\
insert into sales (id, sale_date, product_id, product_name, quantity, unit_price, customer_id, region)
values ($1, $2, $3, $4, $5, $6::float8, $7, $8)
on conflict (id) do nothing";

// Seed rows carry explicit ids; move the serial sequence past them so later
// appends do not collide.
const ADVANCE_SALES_SEQUENCE_SQL: &str = "\
select setval(pg_get_serial_sequence('sales', 'id'), (select coalesce(max(id), 1) from sales))";

/// What a seeding run actually inserted. Zero everywhere means the data was
/// already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub customers_inserted: u64,
    pub sales_inserted: u64,
}

impl PostgresClient {
    /// Create the demo tables if they are missing. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client.batch_execute(CREATE_CUSTOMERS_SQL).await?;
        self.client.batch_execute(CREATE_SALES_SQL).await?;
        Ok(())
    }

    /// Ensure the schema exists and insert any missing seed rows.
    ///
    /// Safe to run repeatedly: inserts are guarded, so existing rows are left
    /// untouched and row counts stay stable. Customers seed before sales to
    /// satisfy the foreign key.
    pub async fn seed(&mut self) -> Result<SeedSummary> {
        self.ensure_schema().await?;

        let tx = self.client.transaction().await?;
        let mut customers_inserted = 0u64;
        for rec in SEED_CUSTOMERS.iter() {
            customers_inserted += tx
                .execute(
                    INSERT_SEED_CUSTOMER_SQL,
                    &[&rec.customer_id, &rec.name, &rec.email, &rec.signup_date],
                )
                .await?;
        }

        let mut sales_inserted = 0u64;
        for rec in SEED_SALES.iter() {
            sales_inserted += tx
                .execute(
                    INSERT_SEED_SALE_SQL,
                    &[
                        &rec.id,
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

        tx.execute(ADVANCE_SALES_SEQUENCE_SQL, &[]).await?;
        tx.commit().await?;

        debug!(customers_inserted, sales_inserted, "seeded demo tables");
        Ok(SeedSummary {
            customers_inserted,
            sales_inserted,
        })
    }

    /// Drop and fully rebuild the demo tables from the built-in dataset.
    pub async fn reseed(&mut self) -> Result<SeedSummary> {
        // sales first, it references customers
        self.client
            .batch_execute("drop table if exists sales; drop table if exists customers")
            .await?;
        self.seed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_guarded_and_constrained() {
        assert!(CREATE_CUSTOMERS_SQL.contains("if not exists"));
        assert!(CREATE_SALES_SQL.contains("if not exists"));
        assert!(CREATE_SALES_SQL.contains("check (quantity > 0)"));
        assert!(CREATE_SALES_SQL.contains("references customers (customer_id)"));
        assert!(INSERT_SEED_CUSTOMER_SQL.contains("on conflict (customer_id) do nothing"));
        assert!(INSERT_SEED_SALE_SQL.contains("on conflict (id) do nothing"));
    }
}
