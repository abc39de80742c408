//! Test utilities
//!
//! Schema fixtures served from an in-memory store and small sample datasets.

pub mod fixtures;
pub mod helpers;

pub use fixtures::{admin_schema, core_schema, sample_dataset, test_store, ADMIN_SCHEMA};
pub use helpers::square;
