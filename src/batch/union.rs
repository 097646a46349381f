//! Builds one `UNION ALL` query out of several schema-compatible requests.
//!
//! Each request is compiled on its own, its placeholders are renamed with a
//! `q{i}_` prefix so parameters from different branches cannot collide, and
//! every branch is tagged with a literal discriminator column naming its type.

use std::collections::HashSet;

use super::BatchOptions;
use super::BatchRequest;
use crate::error::{BatchError, Result};
use crate::query::{placeholder, QueryRegistry};
use crate::store::Params;

/// Column added to every branch of a merged query.
pub const DISCRIMINATOR_COLUMN: &str = "__query_type";

/// Joins the branches of a merged query.
pub const UNION_SEPARATOR: &str = "\nUNION ALL\n";

/// A merged query ready for execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledUnionQuery {
    pub sql: String,
    pub params: Params,
    /// Query types, one per branch, in branch order.
    pub types: Vec<String>,
}

/// Compiles `requests` into a single merged query.
///
/// Fails if any request is unregistered or does not compile, or if the same
/// type appears twice (its branches would be indistinguishable).
pub fn build_union_query(
    registry: &QueryRegistry,
    requests: &[&BatchRequest],
    options: &BatchOptions,
) -> Result<CompiledUnionQuery> {
    let mut branches = Vec::with_capacity(requests.len());
    let mut params = Params::new();
    let mut types = Vec::with_capacity(requests.len());
    let mut seen = HashSet::new();

    for (i, request) in requests.iter().enumerate() {
        let config = registry
            .get(&request.query_type)
            .ok_or_else(|| BatchError::unknown_type(&request.query_type))?;

        if !seen.insert(request.query_type.as_str()) {
            return Err(BatchError::internal(format!(
                "query type '{}' appears twice in one merged query",
                request.query_type
            )));
        }

        let compiled = config.compile(&request.resolved(options), options)?;
        let prefix = format!("q{i}_");

        for (key, value) in compiled.params {
            let prefixed = format!("{prefix}{key}");
            if params.insert(prefixed.clone(), value).is_some() {
                return Err(BatchError::internal(format!(
                    "parameter '{prefixed}' is bound twice"
                )));
            }
        }

        let sql = placeholder::prefix_placeholders(trim_statement(&compiled.sql), &prefix);
        branches.push(format!(
            "SELECT {} AS {DISCRIMINATOR_COLUMN}, * FROM (\n{sql}\n)",
            string_literal(&request.query_type)
        ));
        types.push(request.query_type.clone());
    }

    Ok(CompiledUnionQuery {
        sql: branches.join(UNION_SEPARATOR),
        params,
        types,
    })
}

/// Drops surrounding whitespace and trailing semicolons so the SQL nests.
fn trim_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Quotes a value as a single-quoted SQL string literal.
fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
