//! SQL pushdown report execution.
//!
//! One statement per report; grouping, aggregation and ordering all happen
//! in the database, and result rows decode straight into the typed report
//! structs.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio_postgres::Row;

use tally_core::backend::{BackendError, BackendResult, ReportBackend};
use tally_core::config::PgConfig;
use tally_core::reports::{
    CategorySummary, CustomerOrderStats, MonthlyRevenue, ProductRecord, ProductRevenue,
    RegionalSummary, CATEGORY_ACCESSORIES, CATEGORY_ELECTRONICS, ELECTRONICS_PRODUCTS,
};

use crate::client::PostgresClient;
use crate::errors::{PostgresError, Result};

/// CASE expression equivalent to `category_for_product`. Built from the same
/// product list, so the SQL and in-memory derivations cannot drift apart.
static CATEGORY_CASE: Lazy<String> = Lazy::new(|| {
    let names = ELECTRONICS_PRODUCTS
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "case when product_name in ({names}) \
         then '{CATEGORY_ELECTRONICS}' else '{CATEGORY_ACCESSORIES}' end"
    )
});

const PRODUCT_REVENUE_SQL: &str = "\
select product_id, product_name, \
       sum(quantity)::bigint as total_quantity, \
       sum(quantity * unit_price)::float8 as total_revenue \
from sales \
group by product_id, product_name \
order by total_revenue desc, product_id";

static CATEGORY_SUMMARY_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "select {} as category, \
         count(*)::bigint as order_count, \
         sum(quantity)::bigint as total_quantity, \
         sum(quantity * unit_price)::float8 as total_revenue, \
         avg(quantity * unit_price)::float8 as avg_order_value \
         from sales group by 1 order by total_revenue desc, category",
        CATEGORY_CASE.as_str()
    )
});

static REGIONAL_SUMMARY_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "select region, {} as category, \
         count(*)::bigint as order_count, \
         sum(quantity)::bigint as total_quantity, \
         sum(quantity * unit_price)::float8 as total_revenue \
         from sales group by 1, 2 order by region, category",
        CATEGORY_CASE.as_str()
    )
});

const MONTHLY_REVENUE_SQL: &str = "\
select date_trunc('month', sale_date)::date as month, \
       count(*)::bigint as order_count, \
       sum(quantity * unit_price)::float8 as total_revenue \
from sales \
group by 1 \
order by 1";

const CUSTOMER_STATS_SQL: &str = "\
select c.customer_id, c.name, \
       count(*)::bigint as order_count, \
       sum(s.quantity * s.unit_price)::float8 as total_spent \
from sales s \
join customers c on s.customer_id = c.customer_id \
group by c.customer_id, c.name \
order by total_spent desc, c.customer_id";

static PRODUCTS_SQL: Lazy<String> = Lazy::new(|| {
    format!(
        "select distinct product_id, product_name, {} as category \
         from sales order by product_id, product_name",
        CATEGORY_CASE.as_str()
    )
});

/// Computes reports by pushing the aggregation SQL to the server.
pub struct PostgresBackend {
    client: PostgresClient,
}

impl PostgresBackend {
    pub async fn connect(config: &PgConfig) -> Result<PostgresBackend> {
        Ok(PostgresBackend {
            client: PostgresClient::connect(&config.conn_string()).await?,
        })
    }

    pub fn new(client: PostgresClient) -> PostgresBackend {
        PostgresBackend { client }
    }

    async fn run_report<T>(
        &self,
        sql: &str,
        decode: fn(&Row) -> Result<T>,
    ) -> BackendResult<Vec<T>> {
        let rows = self.client.client.query(sql, &[]).await.map_err(wrap)?;
        rows.iter()
            .map(decode)
            .collect::<Result<Vec<_>>>()
            .map_err(wrap)
    }
}

fn wrap(err: impl Into<PostgresError>) -> BackendError {
    BackendError::new("postgres", err.into())
}

#[async_trait]
impl ReportBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn product_revenue(&self) -> BackendResult<Vec<ProductRevenue>> {
        self.run_report(PRODUCT_REVENUE_SQL, product_revenue_from_row)
            .await
    }

    async fn category_summary(&self) -> BackendResult<Vec<CategorySummary>> {
        self.run_report(&CATEGORY_SUMMARY_SQL, category_summary_from_row)
            .await
    }

    async fn regional_summary(&self) -> BackendResult<Vec<RegionalSummary>> {
        self.run_report(&REGIONAL_SUMMARY_SQL, regional_summary_from_row)
            .await
    }

    async fn monthly_revenue(&self) -> BackendResult<Vec<MonthlyRevenue>> {
        self.run_report(MONTHLY_REVENUE_SQL, monthly_revenue_from_row)
            .await
    }

    async fn customer_stats(&self) -> BackendResult<Vec<CustomerOrderStats>> {
        self.run_report(CUSTOMER_STATS_SQL, customer_stats_from_row)
            .await
    }

    async fn product_catalog(&self) -> BackendResult<Vec<ProductRecord>> {
        self.run_report(&PRODUCTS_SQL, product_record_from_row).await
    }
}

fn product_revenue_from_row(row: &Row) -> Result<ProductRevenue> {
    Ok(ProductRevenue {
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        total_quantity: row.try_get("total_quantity")?,
        total_revenue: row.try_get("total_revenue")?,
    })
}

fn category_summary_from_row(row: &Row) -> Result<CategorySummary> {
    Ok(CategorySummary {
        category: row.try_get("category")?,
        order_count: row.try_get("order_count")?,
        total_quantity: row.try_get("total_quantity")?,
        total_revenue: row.try_get("total_revenue")?,
        avg_order_value: row.try_get("avg_order_value")?,
    })
}

fn regional_summary_from_row(row: &Row) -> Result<RegionalSummary> {
    Ok(RegionalSummary {
        region: row.try_get("region")?,
        category: row.try_get("category")?,
        order_count: row.try_get("order_count")?,
        total_quantity: row.try_get("total_quantity")?,
        total_revenue: row.try_get("total_revenue")?,
    })
}

fn monthly_revenue_from_row(row: &Row) -> Result<MonthlyRevenue> {
    Ok(MonthlyRevenue {
        month: row.try_get("month")?,
        order_count: row.try_get("order_count")?,
        total_revenue: row.try_get("total_revenue")?,
    })
}

fn customer_stats_from_row(row: &Row) -> Result<CustomerOrderStats> {
    Ok(CustomerOrderStats {
        customer_id: row.try_get("customer_id")?,
        name: row.try_get("name")?,
        order_count: row.try_get("order_count")?,
        total_spent: row.try_get("total_spent")?,
    })
}

fn product_record_from_row(row: &Row) -> Result<ProductRecord> {
    Ok(ProductRecord {
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        category: row.try_get("category")?,
    })
}

#[cfg(test)]
mod tests {
    use tally_core::reports::category_for_product;

    use super::*;

    #[test]
    fn category_case_lists_every_electronics_product() {
        for name in ELECTRONICS_PRODUCTS {
            assert!(CATEGORY_CASE.contains(&format!("'{name}'")));
            assert_eq!(category_for_product(name), CATEGORY_ELECTRONICS);
        }
        assert!(CATEGORY_CASE.ends_with(&format!("else '{CATEGORY_ACCESSORIES}' end")));
    }

    #[test]
    fn report_statements_alias_their_columns() {
        assert!(PRODUCT_REVENUE_SQL.contains("as total_revenue"));
        assert!(CATEGORY_SUMMARY_SQL.contains("as avg_order_value"));
        assert!(REGIONAL_SUMMARY_SQL.contains("group by 1, 2"));
        assert!(MONTHLY_REVENUE_SQL.contains("date_trunc('month', sale_date)::date"));
        assert!(CUSTOMER_STATS_SQL.contains("join customers"));
        assert!(PRODUCTS_SQL.contains("select distinct"));
    }
}
