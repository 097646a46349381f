//! Schema signatures: the row shape a query type declares.
//!
//! Two query types can share one merged query only if their signatures are
//! equal. Types without declared output fields have no signature and are
//! never merged.

use serde::Serialize;
use std::fmt;

use crate::query::{OutputField, QueryConfig};

/// Separator between `name:type` pairs.
const FIELD_DELIMITER: &str = ",";

/// Ordered `name:type` pairs of a query's output, e.g. `date:String,views:UInt64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchemaSignature(String);

impl SchemaSignature {
    /// Computes the signature of a field list, or `None` if it is empty.
    ///
    /// Field order is significant and is not normalized.
    pub fn from_fields(fields: &[OutputField]) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let joined = fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.field_type))
            .collect::<Vec<_>>()
            .join(FIELD_DELIMITER);
        Some(Self(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the config's signature, or `None` if it declares no output fields.
pub fn schema_signature(config: &QueryConfig) -> Option<SchemaSignature> {
    config.output_fields().and_then(SchemaSignature::from_fields)
}
