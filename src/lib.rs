//! query-batch - batch execution of analytics queries.
//!
//! Requests whose result rows share a schema are merged into a single
//! `UNION ALL` query against the analytics store and split back apart,
//! falling back to individual execution when a merged query fails.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod store;

pub use batch::{BatchExecutor, BatchOptions, BatchRequest, BatchResult};
pub use error::{BatchError, Result};
pub use query::QueryRegistry;
pub use store::AnalyticsStore;
