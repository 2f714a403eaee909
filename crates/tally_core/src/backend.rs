//! The data-access abstraction shared by all execution engines.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{CoreError, Result};
use crate::exec::{
    CategoryAggState, CustomerAggState, MonthlyAggState, ProductAggState, ProductCatalogState,
    RegionalAggState, SalesAgg,
};
use crate::reports::{
    CategorySummary, CustomerOrderStats, MonthlyRevenue, ProductRecord, ProductRevenue,
    RegionalSummary,
};
use crate::schema::{CustomerRecord, SalesRecord};

/// Error produced by a report backend, wrapping whatever the engine failed
/// with under the backend's label.
#[derive(Debug, thiserror::Error)]
#[error("{backend} backend: {source}")]
pub struct BackendError {
    backend: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl BackendError {
    pub fn new(
        backend: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> BackendError {
        BackendError {
            backend,
            source: source.into(),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A source capable of computing every report.
///
/// Implementations differ in where the aggregation runs: pushed down to the
/// database, locally over an in-memory copy, or scattered over partitioned
/// scans. All of them return identical rows for the same underlying data.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Backend label used in logs and errors.
    fn name(&self) -> &'static str;

    async fn product_revenue(&self) -> BackendResult<Vec<ProductRevenue>>;
    async fn category_summary(&self) -> BackendResult<Vec<CategorySummary>>;
    async fn regional_summary(&self) -> BackendResult<Vec<RegionalSummary>>;
    async fn monthly_revenue(&self) -> BackendResult<Vec<MonthlyRevenue>>;
    async fn customer_stats(&self) -> BackendResult<Vec<CustomerOrderStats>>;
    async fn product_catalog(&self) -> BackendResult<Vec<ProductRecord>>;
}

/// Which engine computes reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Postgres,
    Memory,
    Distributed,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Memory => "memory",
            BackendKind::Distributed => "distributed",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            "distributed" => Ok(BackendKind::Distributed),
            other => Err(CoreError::UnknownBackend(other.to_string())),
        }
    }
}

/// Runs every report over an in-memory copy of the dataset.
///
/// This is the single-partition case of the kernels in [`crate::exec`]: one
/// state folds every row, then finalizes.
pub struct MemoryBackend {
    sales: Vec<SalesRecord>,
    customers: Vec<CustomerRecord>,
}

impl MemoryBackend {
    pub fn new(sales: Vec<SalesRecord>, customers: Vec<CustomerRecord>) -> MemoryBackend {
        MemoryBackend { sales, customers }
    }

    /// Backend over the built-in demo dataset.
    pub fn from_seed() -> MemoryBackend {
        MemoryBackend::new(
            crate::seed::SEED_SALES.clone(),
            crate::seed::SEED_CUSTOMERS.clone(),
        )
    }

    fn fold<S: SalesAgg>(&self) -> S {
        let mut state = S::default();
        state.update_all(&self.sales);
        state
    }
}

#[async_trait]
impl ReportBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn product_revenue(&self) -> BackendResult<Vec<ProductRevenue>> {
        Ok(self.fold::<ProductAggState>().finalize())
    }

    async fn category_summary(&self) -> BackendResult<Vec<CategorySummary>> {
        Ok(self.fold::<CategoryAggState>().finalize())
    }

    async fn regional_summary(&self) -> BackendResult<Vec<RegionalSummary>> {
        Ok(self.fold::<RegionalAggState>().finalize())
    }

    async fn monthly_revenue(&self) -> BackendResult<Vec<MonthlyRevenue>> {
        Ok(self.fold::<MonthlyAggState>().finalize())
    }

    async fn customer_stats(&self) -> BackendResult<Vec<CustomerOrderStats>> {
        Ok(self.fold::<CustomerAggState>().finalize(&self.customers))
    }

    async fn product_catalog(&self) -> BackendResult<Vec<ProductRecord>> {
        Ok(self.fold::<ProductCatalogState>().finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_round_trip() {
        for kind in [
            BackendKind::Postgres,
            BackendKind::Memory,
            BackendKind::Distributed,
        ] {
            assert_eq!(BackendKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            BackendKind::from_str("sqlite"),
            Err(CoreError::UnknownBackend(_))
        ));
    }

    #[test]
    fn backend_error_carries_label() {
        let err = BackendError::new("memory", "boom");
        assert_eq!(err.to_string(), "memory backend: boom");
    }

    #[tokio::test]
    async fn memory_backend_over_seed() {
        let backend = MemoryBackend::from_seed();
        assert_eq!(backend.name(), "memory");

        let products = backend.product_revenue().await.unwrap();
        assert_eq!(products[0].product_name, "Laptop");
        assert_eq!(products[0].total_revenue, 9600.00);

        let customers = backend.customer_stats().await.unwrap();
        assert_eq!(customers[0].name, "John Smith");

        let catalog = backend.product_catalog().await.unwrap();
        assert_eq!(catalog.len(), 7);
    }
}
