//! Mock store for testing.
//!
//! Provides an in-memory store that answers queries from canned rows, can be
//! told to fail, and records every call so tests can count round trips.
//! Merged queries are answered branch by branch, tagging each branch's rows
//! with its discriminator literal the way a real engine would.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use super::{AnalyticsStore, Params, Record};
use crate::batch::{DISCRIMINATOR_COLUMN, UNION_SEPARATOR};
use crate::error::{BatchError, Result};
use crate::query::placeholder;

/// A query received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub sql: String,
    pub params: Params,
}

impl StoreCall {
    /// Returns true if this call was a merged query.
    pub fn is_merged(&self) -> bool {
        self.sql.contains(DISCRIMINATOR_COLUMN)
    }
}

/// A store that returns predefined rows.
#[derive(Debug, Default)]
pub struct MockStore {
    /// SQL substring -> rows returned for it (first match wins).
    responses: Vec<(String, Vec<Record>)>,
    /// SQL substring -> error message.
    failures: Vec<(String, String)>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MockStore {
    /// Creates a mock that returns no rows for every query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `rows` for any query (or union branch) containing `pattern`.
    pub fn with_rows(mut self, pattern: impl Into<String>, rows: Vec<Record>) -> Self {
        self.responses.push((pattern.into(), rows));
        self
    }

    /// Fails any query whose full SQL contains `pattern`.
    pub fn fail_when(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((pattern.into(), message.into()));
        self
    }

    /// Fails every merged query while leaving single queries alone.
    pub fn fail_merged(self, message: impl Into<String>) -> Self {
        self.fail_when(DISCRIMINATOR_COLUMN, message)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock_calls().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<StoreCall>> {
        // A panicking test thread must not hide the calls from other assertions.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rows_for(&self, sql: &str) -> Vec<Record> {
        self.responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }

    /// Answers a merged query one branch at a time.
    fn answer_union(&self, sql: &str) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for branch in sql.split(UNION_SEPARATOR) {
            let (query_type, inner) = parse_branch(branch).ok_or_else(|| {
                BatchError::execution(format!("Mock cannot parse union branch: {branch}"))
            })?;
            for mut row in self.rows_for(inner) {
                row.insert(DISCRIMINATOR_COLUMN.to_string(), Value::from(query_type.as_str()));
                out.push(row);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl AnalyticsStore for MockStore {
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Record>> {
        self.lock_calls().push(StoreCall {
            sql: sql.to_string(),
            params: params.clone(),
        });

        for found in placeholder::placeholders(sql) {
            if !params.contains_key(&found.name) {
                return Err(BatchError::execution(format!(
                    "Substitution `{}` is not set",
                    found.name
                )));
            }
        }

        if let Some((_, message)) = self
            .failures
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Err(BatchError::execution(message.clone()));
        }

        if sql.contains(DISCRIMINATOR_COLUMN) {
            self.answer_union(sql)
        } else {
            Ok(self.rows_for(sql))
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Splits `SELECT '<type>' AS __query_type, * FROM (\n<inner>\n)` into its parts.
fn parse_branch(branch: &str) -> Option<(String, &str)> {
    let marker = format!("' AS {DISCRIMINATOR_COLUMN}, * FROM (");
    let rest = branch.trim().strip_prefix("SELECT '")?;
    let split = rest.find(&marker)?;
    let literal = &rest[..split];
    let inner = rest[split + marker.len()..].strip_suffix(')')?.trim();
    let query_type = literal.replace("\\'", "'").replace("\\\\", "\\");
    Some((query_type, inner))
}
