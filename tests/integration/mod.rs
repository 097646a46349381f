//! Integration tests for query-batch.

pub mod batch_test;
pub mod clickhouse_test;
pub mod common;
pub mod config_test;
pub mod fallback_test;
