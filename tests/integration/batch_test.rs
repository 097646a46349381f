//! Batch execution against the mock store.
//!
//! Tests grouping, ordering and per-request isolation of the executor.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use query_batch::batch::DISCRIMINATOR_COLUMN;
use query_batch::{BatchOptions, BatchRequest, BatchResult};
use serde_json::json;

use super::common::{day, executor, series_request, store};

#[tokio::test]
async fn test_compatible_requests_share_one_round_trip() {
    let store = Arc::new(store());
    let results = executor(store.clone())
        .execute(
            &[series_request("pageviews"), series_request("visitors")],
            &BatchOptions::new(),
        )
        .await;

    assert_eq!(store.call_count(), 1);
    assert!(store.calls()[0].is_merged());
    assert_eq!(
        results,
        vec![
            BatchResult::success(
                "pageviews",
                vec![day("2024-01-01", 120), day("2024-01-02", 95)]
            ),
            BatchResult::success("visitors", vec![day("2024-01-01", 40)]),
        ]
    );
}

#[tokio::test]
async fn test_results_follow_request_order() {
    let store = Arc::new(store());
    let requests = vec![
        series_request("visitors"),
        BatchRequest::new("top_pages")
            .with_dates("2024-01-01", "2024-01-31")
            .with_limit(10),
        series_request("pageviews"),
    ];

    let results = executor(store.clone())
        .execute(&requests, &BatchOptions::new())
        .await;

    let types: Vec<&str> = results.iter().map(|r| r.query_type.as_str()).collect();
    assert_eq!(types, vec!["visitors", "top_pages", "pageviews"]);
    assert!(results.iter().all(BatchResult::is_success));
    // One merged call for the series pair, one single call for top_pages.
    assert_eq!(store.call_count(), 2);
}

#[tokio::test]
async fn test_unknown_type_is_isolated() {
    let store = Arc::new(store());
    let requests = vec![
        series_request("pageviews"),
        series_request("visitors"),
        BatchRequest::new("ghost"),
    ];

    let results = executor(store.clone())
        .execute(&requests, &BatchOptions::new())
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_success());
    assert!(results[1].is_success());
    assert_eq!(
        results[2],
        BatchResult {
            query_type: "ghost".to_string(),
            data: Vec::new(),
            error: Some("Unknown query type: ghost".to_string()),
        }
    );

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].sql.contains("ghost"));
}

#[tokio::test]
async fn test_merged_rows_drop_discriminator() {
    let store = Arc::new(store());
    let results = executor(store)
        .execute(
            &[series_request("pageviews"), series_request("visitors")],
            &BatchOptions::new(),
        )
        .await;

    for result in &results {
        for row in &result.data {
            assert!(!row.contains_key(DISCRIMINATOR_COLUMN));
        }
    }
}

#[tokio::test]
async fn test_parameters_are_isolated_per_branch() {
    let store = Arc::new(store());
    let requests = vec![
        BatchRequest::new("pageviews").with_dates("2024-01-01", "2024-01-31"),
        BatchRequest::new("visitors")
            .with_dates("2024-02-01", "2024-02-29")
            .with_timezone("Europe/Berlin"),
    ];

    executor(store.clone())
        .execute(&requests, &BatchOptions::new().with_timezone("UTC"))
        .await;

    let call = &store.calls()[0];
    assert_eq!(call.params["q0_start_date"], json!("2024-01-01"));
    assert_eq!(call.params["q1_start_date"], json!("2024-02-01"));
    assert_eq!(call.params["q0_timezone"], json!("UTC"));
    assert_eq!(call.params["q1_timezone"], json!("Europe/Berlin"));
    assert!(!call.params.contains_key("start_date"));
}

#[tokio::test]
async fn test_same_type_twice_is_not_merged_with_itself() {
    let store = Arc::new(store());
    let requests = vec![
        series_request("pageviews"),
        BatchRequest::new("pageviews").with_dates("2023-01-01", "2023-01-31"),
    ];

    let results = executor(store.clone())
        .execute(&requests, &BatchOptions::new())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(BatchResult::is_success));
    assert!(store.calls().iter().all(|call| !call.is_merged()));
    assert_eq!(store.call_count(), 2);
}

#[tokio::test]
async fn test_plugins_run_on_single_path() {
    let store = Arc::new(store());
    let request = BatchRequest::new("top_pages")
        .with_dates("2024-01-01", "2024-01-31")
        .with_limit(5);

    let results = executor(store)
        .execute(
            &[request],
            &BatchOptions::new().with_website_domain("example.com"),
        )
        .await;

    assert_eq!(results[0].data[0]["url"], json!("/pricing"));
}

#[tokio::test]
async fn test_compile_error_does_not_abort_batch() {
    let store = Arc::new(store());
    // top_pages needs a limit.
    let requests = vec![
        series_request("pageviews"),
        BatchRequest::new("top_pages").with_dates("2024-01-01", "2024-01-31"),
    ];

    let results = executor(store)
        .execute(&requests, &BatchOptions::new())
        .await;

    assert!(results[0].is_success());
    let error = results[1].error.as_deref().unwrap();
    assert!(error.contains("limit"), "unexpected error: {error}");
}
