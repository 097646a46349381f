//! Recovery from failed merged queries.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use query_batch::{BatchOptions, BatchRequest, BatchResult};

use super::common::{day, executor, series_request, store};

#[tokio::test]
async fn test_failed_merge_runs_members_individually() {
    let store = Arc::new(store().fail_merged("Memory limit (total) exceeded"));
    let results = executor(store.clone())
        .execute(
            &[series_request("pageviews"), series_request("visitors")],
            &BatchOptions::new(),
        )
        .await;

    let calls = store.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_merged());
    assert!(!calls[1].is_merged());
    assert!(!calls[2].is_merged());

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
async fn test_fallback_failure_stays_with_its_request() {
    let store = Arc::new(
        store()
            .fail_merged("Memory limit (total) exceeded")
            .fail_when("FROM visitors", "Table visitors doesn't exist"),
    );
    let results = executor(store.clone())
        .execute(
            &[series_request("pageviews"), series_request("visitors")],
            &BatchOptions::new(),
        )
        .await;

    assert!(results[0].is_success());
    assert_eq!(results[1].query_type, "visitors");
    assert!(results[1].data.is_empty());
    assert_eq!(
        results[1].error.as_deref(),
        Some("Query error: Table visitors doesn't exist")
    );
    // No retry beyond the one individual attempt.
    assert_eq!(store.call_count(), 3);
}

#[tokio::test]
async fn test_a_b_ghost_with_failing_merge() {
    let store = Arc::new(store().fail_merged("Memory limit (total) exceeded"));
    let requests = vec![
        series_request("pageviews"),
        series_request("visitors"),
        BatchRequest::new("ghost"),
    ];

    let results = executor(store.clone())
        .execute(&requests, &BatchOptions::new())
        .await;

    let types: Vec<&str> = results.iter().map(|r| r.query_type.as_str()).collect();
    assert_eq!(types, vec!["pageviews", "visitors", "ghost"]);
    assert!(results[0].is_success());
    assert!(results[1].is_success());
    assert_eq!(
        results[2].error.as_deref(),
        Some("Unknown query type: ghost")
    );
    assert_eq!(store.call_count(), 3);
}

#[tokio::test]
async fn test_single_request_never_merges() {
    let store = Arc::new(store().fail_merged("merged queries are broken"));
    let results = executor(store.clone())
        .execute(&[series_request("pageviews")], &BatchOptions::new())
        .await;

    assert!(results[0].is_success());
    assert_eq!(store.call_count(), 1);
    assert!(!store.calls()[0].is_merged());
}
