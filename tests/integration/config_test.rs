//! Config file to running executor.

use std::sync::Arc;

use query_batch::batch::BatchExecutor;
use query_batch::config::Config;
use query_batch::error::BatchError;
use query_batch::store::{self, record, MockStore, StoreBackend};
use query_batch::{BatchOptions, BatchRequest};
use serde_json::json;

const CONFIG: &str = r#"
[store]
backend = "mock"

[defaults]
timezone = "UTC"
website_domain = "example.com"

[queries.pageviews]
sql = """
SELECT toDate(time, {timezone:String}) AS date, count() AS value
FROM pageviews
WHERE date >= {start_date:String} {{filters}}
GROUP BY date
"""
output_fields = [{ name = "date", type = "Date" }, { name = "value", type = "UInt64" }]
allowed_filters = ["country", "device"]

[queries.visitors]
sql = """
SELECT toDate(time, {timezone:String}) AS date, uniq(visitor) AS value
FROM visitors
WHERE date >= {start_date:String}
GROUP BY date
"""
output_fields = [{ name = "date", type = "Date" }, { name = "value", type = "UInt64" }]
"#;

fn write_config(content: &str) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    let config = Config::load_from_file(&path).unwrap();
    (dir, config)
}

#[tokio::test]
async fn test_config_drives_merged_batch() {
    let (_dir, config) = write_config(CONFIG);
    let registry = Arc::new(config.registry().unwrap());
    let store = Arc::new(
        MockStore::new()
            .with_rows("FROM pageviews", vec![record([("date", json!("2024-01-01")), ("value", json!(3))])])
            .with_rows("FROM visitors", vec![record([("date", json!("2024-01-01")), ("value", json!(2))])]),
    );
    let executor = BatchExecutor::new(registry, store.clone());

    let requests: Vec<BatchRequest> = serde_json::from_value(json!([
        {"type": "pageviews", "startDate": "2024-01-01", "filters": [{"field": "country", "op": "eq", "value": "DE"}]},
        {"type": "visitors", "startDate": "2024-01-01"}
    ]))
    .unwrap();

    let results = executor.execute(&requests, &config.batch_options()).await;

    assert_eq!(store.call_count(), 1);
    assert_eq!(results[0].data[0]["value"], json!(3));
    assert_eq!(results[1].data[0]["value"], json!(2));

    let call = &store.calls()[0];
    assert_eq!(call.params["q0_timezone"], json!("UTC"));
    assert!(call.sql.contains("q0_filter_0"));
}

#[tokio::test]
async fn test_config_mock_backend_connects() {
    let (_dir, config) = write_config(CONFIG);
    assert_eq!(config.store.backend, StoreBackend::Mock);

    let store = store::connect(&config.store).await.unwrap();
    assert_eq!(store.name(), "mock");
    store.ping().await.unwrap();
}

#[test]
fn test_writing_template_is_rejected() {
    let (_dir, config) = write_config(
        r#"
[queries.wipe]
sql = "DELETE FROM pageviews WHERE 1"
"#,
    );

    let err = config.registry().unwrap_err();
    assert!(matches!(err, BatchError::Config(_)), "unexpected error: {err}");
}

#[test]
fn test_compatibility_from_config() {
    let (_dir, config) = write_config(CONFIG);
    let registry = config.registry().unwrap();
    assert!(query_batch::batch::is_compatible(&registry, "pageviews", "visitors"));
    assert_eq!(
        query_batch::batch::compatible_types_of(&registry, "visitors"),
        vec!["pageviews"]
    );
}

#[test]
fn test_options_from_defaults() {
    let (_dir, config) = write_config(CONFIG);
    assert_eq!(
        config.batch_options(),
        BatchOptions::new()
            .with_timezone("UTC")
            .with_website_domain("example.com")
    );
}
