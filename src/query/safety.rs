//! Read-only validation for query templates.
//!
//! Uses sqlparser-rs with the ClickHouse dialect to make sure every registered
//! template is a single read-only query before it can be compiled, merged or
//! executed. Placeholders are replaced by `(NULL)` and the filter macro is
//! dropped so the template parses as plain SQL.

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::ClickHouseDialect;
use sqlparser::parser::Parser;

use super::placeholder;
use super::template::FILTERS_MACRO;
use crate::error::{BatchError, Result};

/// Checks that `sql` is a single read-only query.
pub fn validate_template(name: &str, sql: &str) -> Result<()> {
    let plain = placeholder::substitute(sql, |_, _| "(NULL)".to_string()).replace(FILTERS_MACRO, "");

    let statements = Parser::parse_sql(&ClickHouseDialect {}, &plain).map_err(|e| {
        BatchError::config(format!("Query '{name}': template does not parse: {e}"))
    })?;

    match statements.as_slice() {
        [] => Err(BatchError::config(format!("Query '{name}': template is empty"))),
        [Statement::Query(query)] if is_read_only_query(query) => Ok(()),
        [_] => Err(BatchError::config(format!(
            "Query '{name}': template must be a read-only SELECT"
        ))),
        _ => Err(BatchError::config(format!(
            "Query '{name}': template must contain exactly one statement"
        ))),
    }
}

/// Returns true if the query and everything nested in it only reads.
fn is_read_only_query(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .map(|with| with.cte_tables.iter().all(|cte| is_read_only_query(&cte.query)))
        .unwrap_or(true);

    ctes_read_only && is_read_only_set_expr(&query.body)
}

fn is_read_only_set_expr(set_expr: &SetExpr) -> bool {
    match set_expr {
        SetExpr::Select(select) => select.from.iter().all(is_read_only_relation),
        SetExpr::Query(query) => is_read_only_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_set_expr(left) && is_read_only_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        // Insert, Update and anything added later
        _ => false,
    }
}

fn is_read_only_relation(twj: &TableWithJoins) -> bool {
    is_read_only_factor(&twj.relation)
        && twj.joins.iter().all(|join| is_read_only_factor(&join.relation))
}

fn is_read_only_factor(factor: &TableFactor) -> bool {
    match factor {
        TableFactor::Derived { subquery, .. } => is_read_only_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => is_read_only_relation(table_with_joins),
        _ => true,
    }
}
