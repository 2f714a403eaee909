//! Partitioned report execution.
//!
//! Splits the sales table into contiguous row ranges, folds each range into
//! a partial aggregation state on its own worker task, and merges the
//! partials. Because merging is commutative and associative the result is
//! identical to a single-pass aggregation over the whole table.

pub mod backend;
pub mod errors;
pub mod partition;

pub use backend::DistributedBackend;
pub use partition::{chunk_ranges, partition_ranges, scatter_gather, PartitionRange};
