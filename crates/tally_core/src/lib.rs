//! Core data model, report definitions and aggregation kernels.
//!
//! Everything here is backend-agnostic: the concrete engines (direct SQL,
//! in-memory, partitioned) live in their own crates and implement
//! [`backend::ReportBackend`] over the types defined here.

pub mod backend;
pub mod config;
pub mod errors;
pub mod exec;
pub mod reports;
pub mod schema;
pub mod seed;
pub mod table;
pub mod value;
