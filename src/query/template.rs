//! Template-based query compiler.
//!
//! Query types defined in the config file carry a SQL template with
//! `{name:Type}` placeholders. Compiling a request binds the request's fields
//! to those placeholders and expands the optional `{{filters}}` macro into
//! parameterized predicates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::placeholder;
use super::safety::validate_template;
use super::{CompiledQuery, OutputField, Plugin, QueryCompiler, QueryConfig};
use crate::batch::{BatchOptions, BatchRequest, Filter, FilterOp};
use crate::error::{BatchError, Result};
use crate::store::Params;

/// Macro replaced by the request's filter predicates.
pub const FILTERS_MACRO: &str = "{{filters}}";

/// Timezone used when neither the request, the batch nor the query sets one.
const FALLBACK_TIMEZONE: &str = "UTC";

/// A query type as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// SQL template.
    pub sql: String,

    /// Declared output columns; omit to make the query never mergeable.
    #[serde(default)]
    pub output_fields: Option<Vec<OutputField>>,

    /// Columns requests may filter on.
    #[serde(default)]
    pub allowed_filters: Vec<String>,

    /// Timezone used when the request and batch leave it unset.
    #[serde(default)]
    pub default_timezone: Option<String>,

    /// Post-processing applied to result rows, in order.
    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

impl QueryDefinition {
    /// Validates the definition and turns it into a registry entry.
    pub fn into_config(self, name: &str) -> Result<QueryConfig> {
        validate_template(name, &self.sql)?;

        for field in &self.allowed_filters {
            if !placeholder::is_valid_name(field) {
                return Err(BatchError::config(format!(
                    "Query '{name}': invalid filter column '{field}'"
                )));
            }
        }

        let compiler = TemplateCompiler {
            sql: self.sql,
            allowed_filters: self.allowed_filters,
            default_timezone: self.default_timezone,
        };

        let mut config = QueryConfig::new(name, Arc::new(compiler)).with_plugins(self.plugins);
        if let Some(fields) = self.output_fields {
            config = config.with_output_fields(fields);
        }
        Ok(config)
    }
}

/// Compiles requests by binding them into a SQL template.
#[derive(Debug, Clone, Default)]
pub struct TemplateCompiler {
    sql: String,
    allowed_filters: Vec<String>,
    default_timezone: Option<String>,
}

impl TemplateCompiler {
    /// Creates a compiler for `sql` with no filterable columns.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_allowed_filters<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_filters = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = Some(timezone.into());
        self
    }

    /// Expands the filter macro, collecting the filter parameters.
    fn render_filters(&self, request: &BatchRequest, bound: &mut Params) -> Result<String> {
        if request.filters.is_empty() {
            return Ok(self.sql.replace(FILTERS_MACRO, ""));
        }
        if !self.sql.contains(FILTERS_MACRO) {
            return Err(BatchError::compile(format!(
                "query type '{}' does not accept filters",
                request.query_type
            )));
        }

        let mut predicates = String::new();
        for (i, filter) in request.filters.iter().enumerate() {
            if !self.allowed_filters.iter().any(|f| f == &filter.field) {
                return Err(BatchError::compile(format!(
                    "filtering on '{}' is not allowed for query type '{}'",
                    filter.field, request.query_type
                )));
            }
            let name = format!("filter_{i}");
            predicates.push_str(" AND ");
            predicates.push_str(&filter_predicate(filter, &name)?);
            bound.insert(name, filter.value.clone());
        }

        Ok(self.sql.replace(FILTERS_MACRO, &predicates))
    }
}

impl QueryCompiler for TemplateCompiler {
    fn compile(&self, request: &BatchRequest, options: &BatchOptions) -> Result<CompiledQuery> {
        let mut bound: Params = request
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let timezone = request
            .timezone
            .as_deref()
            .or(self.default_timezone.as_deref())
            .unwrap_or(FALLBACK_TIMEZONE);
        bound.insert("timezone".to_string(), Value::from(timezone));

        if let Some(start) = &request.start_date {
            bound.insert("start_date".to_string(), Value::from(start.as_str()));
        }
        if let Some(end) = &request.end_date {
            bound.insert("end_date".to_string(), Value::from(end.as_str()));
        }
        if let Some(limit) = request.limit {
            bound.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(offset) = request.offset {
            bound.insert("offset".to_string(), Value::from(offset));
        }
        if let Some(domain) = &options.website_domain {
            bound.insert("website_domain".to_string(), Value::from(domain.as_str()));
        }

        let sql = self.render_filters(request, &mut bound)?;

        let mut params = Params::new();
        for found in placeholder::placeholders(&sql) {
            let value = bound.remove(&found.name).ok_or_else(|| {
                BatchError::compile(format!(
                    "missing parameter '{}' for query type '{}'",
                    found.name, request.query_type
                ))
            })?;
            params.insert(found.name, value);
        }

        Ok(CompiledQuery::new(sql, params))
    }
}

/// Renders one filter as a predicate over the placeholder `name`.
fn filter_predicate(filter: &Filter, name: &str) -> Result<String> {
    let field = &filter.field;
    let ty = value_type(&filter.value, filter.op)?;
    let predicate = match filter.op {
        FilterOp::Eq => format!("{field} = {{{name}:{ty}}}"),
        FilterOp::Ne => format!("{field} != {{{name}:{ty}}}"),
        FilterOp::Contains => format!("positionCaseInsensitive({field}, {{{name}:{ty}}}) > 0"),
        FilterOp::NotContains => format!("positionCaseInsensitive({field}, {{{name}:{ty}}}) = 0"),
        FilterOp::StartsWith => format!("startsWith({field}, {{{name}:{ty}}})"),
        FilterOp::In => format!("{field} IN {{{name}:{ty}}}"),
        FilterOp::NotIn => format!("{field} NOT IN {{{name}:{ty}}}"),
    };
    Ok(predicate)
}

/// Picks the placeholder type for a filter value.
fn value_type(value: &Value, op: FilterOp) -> Result<String> {
    let text_only = matches!(
        op,
        FilterOp::Contains | FilterOp::NotContains | FilterOp::StartsWith
    );

    match value {
        Value::Array(items) if op.is_list() => {
            let element = items
                .iter()
                .map(scalar_type)
                .try_fold(None::<&str>, |acc, ty| match (acc, ty) {
                    (_, None) => Err(BatchError::compile("filter list values must be scalars")),
                    (None, Some(ty)) => Ok(Some(ty)),
                    (Some(a), Some(b)) if a == b => Ok(Some(a)),
                    (Some("Int64" | "Float64"), Some("Int64" | "Float64")) => Ok(Some("Float64")),
                    (Some(a), Some(b)) => Err(BatchError::compile(format!(
                        "filter list mixes {a} and {b} values"
                    ))),
                })?
                .unwrap_or("String");
            Ok(format!("Array({element})"))
        }
        _ if op.is_list() => Err(BatchError::compile(format!(
            "filter operator '{op}' needs a list value"
        ))),
        Value::String(_) => Ok("String".to_string()),
        _ if text_only => Err(BatchError::compile(format!(
            "filter operator '{op}' needs a text value"
        ))),
        other => scalar_type(other)
            .map(str::to_string)
            .ok_or_else(|| BatchError::compile("filter value must be a scalar")),
    }
}

fn scalar_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(_) => Some("String"),
        Value::Bool(_) => Some("Bool"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("Int64"),
        Value::Number(_) => Some("Float64"),
        _ => None,
    }
}
