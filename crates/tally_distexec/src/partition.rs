//! Splitting a row range into contiguous partitions.

use tally_core::exec::SalesAgg;
use tally_core::schema::SalesRecord;

/// A contiguous slice of a table, addressed by row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub offset: u64,
    pub limit: u64,
}

/// Split `total` rows into contiguous ranges, one per partition.
///
/// The partition count is capped at one row per partition, so a small table
/// yields fewer, never-empty ranges. Ranges are adjacent and in order, and
/// together cover exactly `[0, total)`; an uneven split puts the remainder
/// in the last range. Zero partitions are treated as one.
pub fn partition_ranges(total: u64, partitions: usize) -> Vec<PartitionRange> {
    if total == 0 {
        return Vec::new();
    }
    let partitions = (partitions.max(1) as u64).min(total);
    let base = total / partitions;

    let mut out = Vec::with_capacity(partitions as usize);
    let mut offset = 0;
    for idx in 0..partitions {
        let limit = if idx == partitions - 1 {
            total - offset
        } else {
            base
        };
        out.push(PartitionRange { offset, limit });
        offset += limit;
    }
    out
}

/// Split one partition's range into fetch-sized pages.
///
/// Pages are adjacent, in order and at most `chunk_size` rows each; the last
/// page holds whatever remains. A zero chunk size is treated as one.
pub fn chunk_ranges(range: PartitionRange, chunk_size: u64) -> Vec<PartitionRange> {
    let chunk_size = chunk_size.max(1);
    let mut out = Vec::new();
    let mut offset = range.offset;
    let mut remaining = range.limit;
    while remaining > 0 {
        let limit = remaining.min(chunk_size);
        out.push(PartitionRange { offset, limit });
        offset += limit;
        remaining -= limit;
    }
    out
}

/// Partition `rows` and aggregate each partition into its own state, merging
/// the partials into one. Produces the same state as a single pass; useful
/// for exercising the scatter/merge path without a database.
pub fn scatter_gather<S: SalesAgg>(rows: &[SalesRecord], partitions: usize) -> S {
    let mut acc = S::default();
    for range in partition_ranges(rows.len() as u64, partitions) {
        let start = range.offset as usize;
        let end = start + range.limit as usize;
        let mut part = S::default();
        part.update_all(&rows[start..end]);
        acc.merge(part);
    }
    acc
}
