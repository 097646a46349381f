//! Request, option and result types for batch execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::BatchError;
use crate::store::Record;

/// Comparison applied by a request filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    NotContains,
    StartsWith,
    In,
    NotIn,
}

impl FilterOp {
    /// Returns true if the operator takes a list value.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::In => "in",
            Self::NotIn => "not_in",
        };
        write!(f, "{s}")
    }
}

/// A filter on one column of a query's source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// One query in a batch.
///
/// Well-known fields are typed; anything else a query type needs travels in
/// `params` and is bound to the placeholder of the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Registered query type to run.
    #[serde(rename = "type")]
    pub query_type: String,

    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// IANA timezone; takes precedence over the batch-level default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,

    /// Query-specific parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl BatchRequest {
    /// Creates a request with only a query type set.
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            start_date: None,
            end_date: None,
            timezone: None,
            limit: None,
            offset: None,
            filters: Vec::new(),
            params: Map::new(),
        }
    }

    pub fn with_dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns the request as it should be compiled under `options`.
    ///
    /// The request's own timezone wins; the batch default only fills a gap.
    pub fn resolved(&self, options: &BatchOptions) -> BatchRequest {
        let mut request = self.clone();
        if request.timezone.is_none() {
            request.timezone = options.timezone.clone();
        }
        request
    }
}

/// Options shared by every request in a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Site the data belongs to; used by URL-normalizing plugins.
    #[serde(default, alias = "websiteDomain")]
    pub website_domain: Option<String>,

    /// Default timezone for requests that do not specify one.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_website_domain(mut self, domain: impl Into<String>) -> Self {
        self.website_domain = Some(domain.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Outcome of one request.
///
/// `error` being absent is the only success signal; an empty `data` with no
/// error is a valid, successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(rename = "type")]
    pub query_type: String,

    pub data: Vec<Record>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn success(query_type: impl Into<String>, data: Vec<Record>) -> Self {
        Self {
            query_type: query_type.into(),
            data,
            error: None,
        }
    }

    pub fn failure(query_type: impl Into<String>, error: &BatchError) -> Self {
        Self {
            query_type: query_type.into(),
            data: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Placeholder for a request that produced nothing at all.
    pub fn empty(query_type: impl Into<String>) -> Self {
        Self::success(query_type, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
