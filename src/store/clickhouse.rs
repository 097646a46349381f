//! ClickHouse store implementation.
//!
//! Talks to ClickHouse over its HTTP interface. SQL goes in the request body,
//! `{name:Type}` parameters travel as `param_<name>` query arguments and rows
//! come back as `JSONEachRow`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::StoreConfig;
use crate::error::{BatchError, Result};
use crate::store::{AnalyticsStore, Params, Record};

/// Default ClickHouse HTTP endpoint.
const DEFAULT_URL: &str = "http://localhost:8123";

/// Maximum number of attempts for connection-level failures.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 250;

/// ClickHouse HTTP client.
#[derive(Debug, Clone)]
pub struct ClickHouseStore {
    client: Client,
    url: Url,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    timeout_secs: u64,
}

impl ClickHouseStore {
    /// Creates a client from the store configuration.
    ///
    /// No request is made; use [`AnalyticsStore::ping`] to verify connectivity.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let raw = config.url.as_deref().unwrap_or(DEFAULT_URL);
        let url = Url::parse(raw)
            .map_err(|e| BatchError::config(format!("Invalid store url '{raw}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(BatchError::config(format!(
                "Invalid scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BatchError::store(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            database: config.database.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Builds the query-string arguments for one request.
    fn query_args(&self, params: &Params) -> Vec<(String, String)> {
        let mut args = vec![
            ("default_format".to_string(), "JSONEachRow".to_string()),
            (
                "output_format_json_quote_64bit_integers".to_string(),
                "0".to_string(),
            ),
        ];
        if let Some(database) = &self.database {
            args.push(("database".to_string(), database.clone()));
        }
        for (name, value) in params {
            args.push((format!("param_{name}"), encode_param(value)));
        }
        args
    }

    /// Sends one request, retrying only when the server could not be reached.
    async fn send(&self, sql: &str, params: &Params) -> Result<String> {
        let args = self.query_args(params);
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            let mut request = self
                .client
                .post(self.url.clone())
                .query(&args)
                .body(sql.to_string());
            if let Some(user) = &self.user {
                request = request.header("X-ClickHouse-User", user);
            }
            if let Some(password) = &self.password {
                request = request.header("X-ClickHouse-Key", password);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(|e| {
                        BatchError::execution(format!("Failed to read response body: {e}"))
                    })?;
                    if status.is_success() {
                        return Ok(body);
                    }
                    return Err(map_status_error(status, &body));
                }
                Err(e) if e.is_timeout() => {
                    return Err(BatchError::execution(format!(
                        "Query timed out after {} seconds",
                        self.timeout_secs
                    )));
                }
                Err(e) if e.is_connect() && attempt < MAX_RETRY_ATTEMPTS => {
                    warn!(
                        "Store request attempt {} failed to connect, retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    return Err(BatchError::store(format!(
                        "Cannot reach ClickHouse at {}: {e}",
                        self.url
                    )));
                }
            }
        }

        Err(BatchError::store(format!(
            "Cannot reach ClickHouse at {} after {MAX_RETRY_ATTEMPTS} attempts",
            self.url
        )))
    }
}

#[async_trait]
impl AnalyticsStore for ClickHouseStore {
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Record>> {
        debug!(params = params.len(), "Executing ClickHouse query");
        let body = self.send(sql, params).await?;
        parse_json_each_row(&body)
    }

    async fn ping(&self) -> Result<()> {
        self.send("SELECT 1", &Params::new()).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

/// Parses a `JSONEachRow` body: one JSON object per non-empty line.
fn parse_json_each_row(body: &str) -> Result<Vec<Record>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<Record>(line)
                .map_err(|e| BatchError::execution(format!("Malformed row from store: {e}")))
        })
        .collect()
}

/// Turns a non-2xx response into an error, keeping the server's message.
fn map_status_error(status: StatusCode, body: &str) -> BatchError {
    let message = body.trim();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BatchError::store(format!("Authentication failed: {message}"))
        }
        _ if message.is_empty() => BatchError::execution(format!("ClickHouse returned {status}")),
        _ => BatchError::execution(message.to_string()),
    }
}

/// Encodes a parameter value the way ClickHouse expects in `param_<name>`.
///
/// Top-level strings are sent raw (with escape sequences escaped), arrays use
/// ClickHouse literal syntax and null becomes `\N`.
pub fn encode_param(value: &Value) -> String {
    match value {
        Value::Null => "\\N".to_string(),
        Value::String(s) => escape_raw(s),
        Value::Array(items) => encode_array(items),
        other => encode_scalar(other),
    }
}

fn encode_array(items: &[Value]) -> String {
    let inner = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::Array(nested) => encode_array(nested),
            other => encode_scalar(other),
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("[{inner}]")
}

fn encode_scalar(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn escape_raw(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
