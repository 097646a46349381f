//! Routes rows of a merged query back to the query types they came from.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::union::DISCRIMINATOR_COLUMN;
use crate::error::{BatchError, Result};
use crate::store::Record;

/// Buckets `rows` by their discriminator column.
///
/// Every type in `types` gets a bucket, even if its branch returned nothing.
/// The discriminator column is removed from each row. Rows naming a type not
/// in `types` are dropped; rows with no usable discriminator are an error.
pub fn split_results(rows: Vec<Record>, types: &[String]) -> Result<HashMap<String, Vec<Record>>> {
    let mut by_type: HashMap<String, Vec<Record>> =
        types.iter().map(|t| (t.clone(), Vec::new())).collect();
    let mut dropped = 0usize;

    for mut row in rows {
        match row.remove(DISCRIMINATOR_COLUMN) {
            Some(Value::String(query_type)) => match by_type.get_mut(&query_type) {
                Some(bucket) => bucket.push(row),
                None => dropped += 1,
            },
            Some(other) => {
                return Err(BatchError::split(format!(
                    "discriminator column holds {other} instead of a query type"
                )));
            }
            None => {
                return Err(BatchError::split(format!(
                    "row is missing the {DISCRIMINATOR_COLUMN} column"
                )));
            }
        }
    }

    if dropped > 0 {
        debug!("Dropped {} rows with an unexpected discriminator", dropped);
    }

    Ok(by_type)
}
