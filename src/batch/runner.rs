//! Runs one request on its own.

use tracing::debug;

use super::{BatchOptions, BatchRequest, BatchResult};
use crate::error::{BatchError, Result};
use crate::query::{apply_plugins, QueryRegistry};
use crate::store::{AnalyticsStore, Record};

/// Executes a single request end to end: compile, query, post-process.
///
/// Never fails: an unknown type or any error along the way becomes the
/// result's `error`, with empty `data`.
pub async fn run_single(
    registry: &QueryRegistry,
    store: &dyn AnalyticsStore,
    request: &BatchRequest,
    options: &BatchOptions,
) -> BatchResult {
    match execute_single(registry, store, request, options).await {
        Ok(rows) => BatchResult::success(&request.query_type, rows),
        Err(e) => {
            debug!(query_type = %request.query_type, "Query failed: {}", e);
            BatchResult::failure(&request.query_type, &e)
        }
    }
}

async fn execute_single(
    registry: &QueryRegistry,
    store: &dyn AnalyticsStore,
    request: &BatchRequest,
    options: &BatchOptions,
) -> Result<Vec<Record>> {
    let config = registry
        .get(&request.query_type)
        .ok_or_else(|| BatchError::unknown_type(&request.query_type))?;

    let compiled = config.compile(&request.resolved(options), options)?;
    let rows = store.query(&compiled.sql, &compiled.params).await?;

    Ok(apply_plugins(rows, config, options.website_domain.as_deref()))
}
