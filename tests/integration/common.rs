//! Shared fixtures: a small registry of web-analytics query types.

use std::sync::Arc;

use query_batch::batch::BatchExecutor;
use query_batch::query::{OutputField, Plugin, QueryConfig, QueryRegistry, TemplateCompiler};
use query_batch::store::{record, MockStore, Record};
use query_batch::BatchRequest;
use serde_json::json;

pub const PAGEVIEWS_SQL: &str = "SELECT toDate(time, {timezone:String}) AS date, count() AS value \
     FROM pageviews WHERE date >= {start_date:String} AND date <= {end_date:String} GROUP BY date";

pub const VISITORS_SQL: &str = "SELECT toDate(time, {timezone:String}) AS date, uniq(visitor) AS value \
     FROM visitors WHERE date >= {start_date:String} AND date <= {end_date:String} GROUP BY date";

pub const TOP_PAGES_SQL: &str = "SELECT url, count() AS views FROM top_pages \
     WHERE date >= {start_date:String} GROUP BY url ORDER BY views DESC LIMIT {limit:UInt64}";

fn series() -> Vec<OutputField> {
    vec![
        OutputField::new("date", "Date"),
        OutputField::new("value", "UInt64"),
    ]
}

pub fn registry() -> Arc<QueryRegistry> {
    let registry = QueryRegistry::builder()
        .register(
            QueryConfig::new("pageviews", Arc::new(TemplateCompiler::new(PAGEVIEWS_SQL)))
                .with_output_fields(series()),
        )
        .unwrap()
        .register(
            QueryConfig::new("visitors", Arc::new(TemplateCompiler::new(VISITORS_SQL)))
                .with_output_fields(series()),
        )
        .unwrap()
        .register(
            QueryConfig::new("top_pages", Arc::new(TemplateCompiler::new(TOP_PAGES_SQL)))
                .with_output_fields(vec![
                    OutputField::new("url", "String"),
                    OutputField::new("views", "UInt64"),
                ])
                .with_plugins(vec![Plugin::StripDomain {
                    field: "url".to_string(),
                }]),
        )
        .unwrap()
        .build();
    Arc::new(registry)
}

pub fn day(date: &str, value: u64) -> Record {
    record([("date", json!(date)), ("value", json!(value))])
}

pub fn store() -> MockStore {
    MockStore::new()
        .with_rows(
            "FROM pageviews",
            vec![day("2024-01-01", 120), day("2024-01-02", 95)],
        )
        .with_rows("FROM visitors", vec![day("2024-01-01", 40)])
        .with_rows(
            "FROM top_pages",
            vec![record([
                ("url", json!("https://example.com/pricing")),
                ("views", json!(7)),
            ])],
        )
}

pub fn executor(store: Arc<MockStore>) -> BatchExecutor {
    BatchExecutor::new(registry(), store)
}

/// A request for one of the dated series types.
pub fn series_request(query_type: &str) -> BatchRequest {
    BatchRequest::new(query_type).with_dates("2024-01-01", "2024-01-31")
}
