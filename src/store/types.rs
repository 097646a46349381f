//! Row and parameter types exchanged with the analytical store.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single result row: column name to JSON value.
pub type Record = Map<String, Value>;

/// Named query parameters bound to `{name:Type}` placeholders.
///
/// Values are scalars or arrays. Ordered so that generated requests and
/// test assertions are deterministic.
pub type Params = BTreeMap<String, Value>;

/// Builds a record from `(column, value)` pairs.
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
