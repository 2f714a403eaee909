//! PostgreSQL storage layer and SQL pushdown report backend.

pub mod backend;
pub mod client;
pub mod errors;
pub mod read;
pub mod seed;
pub mod write;

pub use backend::PostgresBackend;
pub use client::{PgColumn, PostgresClient};
pub use read::TableScan;
pub use seed::SeedSummary;
pub use write::WriteMode;
