//! Live ClickHouse tests.
//!
//! Set CLICKHOUSE_URL (and optionally CLICKHOUSE_USER, CLICKHOUSE_PASSWORD)
//! to run them.

use std::sync::Arc;

use query_batch::batch::BatchExecutor;
use query_batch::config::StoreConfig;
use query_batch::query::{OutputField, QueryConfig, QueryRegistry, TemplateCompiler};
use query_batch::store::{AnalyticsStore, ClickHouseStore};
use query_batch::{BatchOptions, BatchRequest};
use serde_json::json;

/// Helper to create a store from the environment.
fn get_test_store() -> Option<ClickHouseStore> {
    std::env::var("CLICKHOUSE_URL").ok()?;
    let mut config = StoreConfig::default();
    config.apply_env_defaults();
    ClickHouseStore::new(&config).ok()
}

#[tokio::test]
async fn test_merged_query_against_clickhouse() {
    let Some(store) = get_test_store() else {
        eprintln!("Skipping test: CLICKHOUSE_URL not set");
        return;
    };

    store.ping().await.unwrap();

    let fields = vec![OutputField::new("n", "UInt64")];
    let registry = QueryRegistry::builder()
        .register(
            QueryConfig::new(
                "small",
                Arc::new(TemplateCompiler::new(
                    "SELECT number AS n FROM system.numbers LIMIT {limit:UInt64}",
                )),
            )
            .with_output_fields(fields.clone()),
        )
        .unwrap()
        .register(
            QueryConfig::new(
                "offset",
                Arc::new(TemplateCompiler::new(
                    "SELECT number + 100 AS n FROM system.numbers LIMIT {limit:UInt64}",
                )),
            )
            .with_output_fields(fields),
        )
        .unwrap()
        .build();

    let executor = BatchExecutor::new(Arc::new(registry), Arc::new(store));
    let results = executor
        .execute(
            &[
                BatchRequest::new("small").with_limit(2),
                BatchRequest::new("offset").with_limit(1),
            ],
            &BatchOptions::new(),
        )
        .await;

    assert_eq!(results[0].error, None);
    assert_eq!(results[0].data.len(), 2);
    assert_eq!(results[1].data[0]["n"], json!(100));
}
