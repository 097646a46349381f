//! Analytical store abstraction for query-batch.
//!
//! Provides a trait-based interface for running parameterized SQL, allowing
//! the ClickHouse HTTP client and the in-memory mock to be used interchangeably.

mod clickhouse;
mod mock;
mod types;

pub use clickhouse::{encode_param, ClickHouseStore};
pub use mock::{MockStore, StoreCall};
pub use types::{record, Params, Record};

use crate::config::StoreConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    ClickHouse,
    Mock,
}

impl StoreBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClickHouse => "clickhouse",
            Self::Mock => "mock",
        }
    }
}

/// Creates a store client for the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<Box<dyn AnalyticsStore>> {
    match config.backend {
        StoreBackend::ClickHouse => {
            let store = ClickHouseStore::new(config)?;
            Ok(Box::new(store))
        }
        StoreBackend::Mock => Ok(Box::new(MockStore::new())),
    }
}

/// Interface to the columnar store that batches are executed against.
///
/// Implementations must fail on malformed SQL, parameter binding errors and
/// timeouts rather than returning partial rows.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Runs a parameterized query and returns its rows in store order.
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Record>>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}
