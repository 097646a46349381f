//! Registry-wide compatibility queries, for callers planning their batches.

use std::collections::BTreeMap;

use super::signature::{schema_signature, SchemaSignature};
use crate::query::QueryRegistry;

/// Returns true if both types are registered and share a signature.
pub fn is_compatible(registry: &QueryRegistry, a: &str, b: &str) -> bool {
    let signature_of = |t: &str| registry.get(t).and_then(schema_signature);
    match (signature_of(a), signature_of(b)) {
        (Some(sa), Some(sb)) => sa == sb,
        _ => false,
    }
}

/// Other registered types sharing `query_type`'s signature, in name order.
pub fn compatible_types_of(registry: &QueryRegistry, query_type: &str) -> Vec<String> {
    let Some(signature) = registry.get(query_type).and_then(schema_signature) else {
        return Vec::new();
    };

    registry
        .iter()
        .filter(|(name, config)| {
            *name != query_type && schema_signature(config).as_ref() == Some(&signature)
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Every signature mapped to the types that declare it.
pub fn all_schema_groups(registry: &QueryRegistry) -> BTreeMap<SchemaSignature, Vec<String>> {
    let mut groups: BTreeMap<SchemaSignature, Vec<String>> = BTreeMap::new();
    for (name, config) in registry.iter() {
        if let Some(signature) = schema_signature(config) {
            groups.entry(signature).or_default().push(name.to_string());
        }
    }
    groups
}
