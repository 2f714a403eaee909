//! Report backend that scatters partitioned scans over worker tasks.

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::debug;

use tally_core::backend::{BackendError, BackendResult, ReportBackend};
use tally_core::config::{PgConfig, ScanConfig};
use tally_core::exec::{
    CategoryAggState, CustomerAggState, MonthlyAggState, ProductAggState, ProductCatalogState,
    RegionalAggState, SalesAgg,
};
use tally_core::reports::{
    CategorySummary, CustomerOrderStats, MonthlyRevenue, ProductRecord, ProductRevenue,
    RegionalSummary,
};
use tally_core::schema::{CustomerRecord, SALES_TABLE};
use tally_postgres::PostgresClient;

use crate::errors::{DistExecError, Result};
use crate::partition::{chunk_ranges, partition_ranges};

/// Computes reports by scanning disjoint slices of the sales table on
/// parallel worker tasks and merging their partial states.
///
/// Each worker opens its own connection, so the partition count is also the
/// connection fan-out against the server. Workers page their slice
/// `chunk_size` rows at a time and fold each page as it arrives.
pub struct DistributedBackend {
    conn_string: String,
    partitions: usize,
    chunk_size: u64,
}

impl DistributedBackend {
    pub fn new(
        conn_string: impl Into<String>,
        partitions: usize,
        chunk_size: usize,
    ) -> DistributedBackend {
        DistributedBackend {
            conn_string: conn_string.into(),
            partitions: partitions.max(1),
            chunk_size: (chunk_size as u64).max(1),
        }
    }

    /// Backend over the connection and scan tuning in the application
    /// config.
    pub fn from_config(pg: &PgConfig, scan: &ScanConfig) -> DistributedBackend {
        DistributedBackend::new(pg.conn_string(), scan.partitions, scan.chunk_size)
    }

    /// Fold every sales row into an `S`, one worker task per partition.
    ///
    /// Partials merge in completion order, which is fine because merging is
    /// commutative.
    async fn gather<S: SalesAgg>(&self) -> Result<S> {
        let coordinator = PostgresClient::connect(&self.conn_string).await?;
        let total = coordinator.row_count(SALES_TABLE).await? as u64;
        let ranges = partition_ranges(total, self.partitions);
        debug!(
            total,
            partitions = ranges.len(),
            chunk_size = self.chunk_size,
            "scattering sales scan"
        );

        let mut tasks: JoinSet<Result<S>> = JoinSet::new();
        for range in ranges {
            let conn_string = self.conn_string.clone();
            let chunk_size = self.chunk_size;
            tasks.spawn(async move {
                let client = PostgresClient::connect(&conn_string).await?;
                let mut state = S::default();
                for page in chunk_ranges(range, chunk_size) {
                    let rows = client.fetch_sales_slice(page.offset, page.limit).await?;
                    state.update_all(&rows);
                }
                Ok(state)
            });
        }

        let mut acc = S::default();
        while let Some(joined) = tasks.join_next().await {
            acc.merge(joined??);
        }
        Ok(acc)
    }

    async fn fetch_customers(&self) -> Result<Vec<CustomerRecord>> {
        let client = PostgresClient::connect(&self.conn_string).await?;
        Ok(client.fetch_customers().await?)
    }
}

fn wrap(err: DistExecError) -> BackendError {
    BackendError::new("distributed", err)
}

#[async_trait]
impl ReportBackend for DistributedBackend {
    fn name(&self) -> &'static str {
        "distributed"
    }

    async fn product_revenue(&self) -> BackendResult<Vec<ProductRevenue>> {
        let state = self.gather::<ProductAggState>().await.map_err(wrap)?;
        Ok(state.finalize())
    }

    async fn category_summary(&self) -> BackendResult<Vec<CategorySummary>> {
        let state = self.gather::<CategoryAggState>().await.map_err(wrap)?;
        Ok(state.finalize())
    }

    async fn regional_summary(&self) -> BackendResult<Vec<RegionalSummary>> {
        let state = self.gather::<RegionalAggState>().await.map_err(wrap)?;
        Ok(state.finalize())
    }

    async fn monthly_revenue(&self) -> BackendResult<Vec<MonthlyRevenue>> {
        let state = self.gather::<MonthlyAggState>().await.map_err(wrap)?;
        Ok(state.finalize())
    }

    async fn customer_stats(&self) -> BackendResult<Vec<CustomerOrderStats>> {
        let state = self.gather::<CustomerAggState>().await.map_err(wrap)?;
        let customers = self.fetch_customers().await.map_err(wrap)?;
        Ok(state.finalize(&customers))
    }

    async fn product_catalog(&self) -> BackendResult<Vec<ProductRecord>> {
        let state = self.gather::<ProductCatalogState>().await.map_err(wrap)?;
        Ok(state.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_partitions_and_chunk_size() {
        let backend = DistributedBackend::new("host=localhost", 0, 0);
        assert_eq!(backend.partitions, 1);
        assert_eq!(backend.chunk_size, 1);
        assert_eq!(backend.name(), "distributed");
    }
}
