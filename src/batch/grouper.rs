//! Partitions a batch into groups that can share one merged query.

use std::collections::HashMap;

use super::signature::{schema_signature, SchemaSignature};
use super::BatchRequest;
use crate::query::QueryRegistry;

/// Identifies a group of requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Requests whose types share a signature. A type appears at most once per
    /// round; its second request in the same batch lands in round 1, and so on.
    Schema {
        signature: SchemaSignature,
        round: usize,
    },
    /// A single request whose type declares no output schema.
    Solo { query_type: String, occurrence: usize },
}

/// A request together with its position in the batch.
#[derive(Debug, Clone, Copy)]
pub struct GroupMember<'a> {
    pub index: usize,
    pub request: &'a BatchRequest,
}

/// Requests that will be executed together.
#[derive(Debug, Clone)]
pub struct RequestGroup<'a> {
    pub key: GroupKey,
    pub members: Vec<GroupMember<'a>>,
}

impl RequestGroup<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Groups registered requests by schema signature.
///
/// Groups come back in order of first appearance and members keep their batch
/// order. Requests for unregistered types are left out.
pub fn group_by_schema<'a>(
    registry: &QueryRegistry,
    requests: &'a [BatchRequest],
) -> Vec<RequestGroup<'a>> {
    let mut groups: Vec<RequestGroup<'a>> = Vec::new();
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();
    let mut seen: HashMap<(Option<SchemaSignature>, &str), usize> = HashMap::new();

    for (index, request) in requests.iter().enumerate() {
        let Some(config) = registry.get(&request.query_type) else {
            continue;
        };

        let signature = schema_signature(config);
        let count = seen
            .entry((signature.clone(), request.query_type.as_str()))
            .or_insert(0);
        let key = match signature {
            Some(signature) => GroupKey::Schema {
                signature,
                round: *count,
            },
            None => GroupKey::Solo {
                query_type: request.query_type.clone(),
                occurrence: *count,
            },
        };
        *count += 1;

        let member = GroupMember { index, request };
        match positions.get(&key) {
            Some(&pos) => groups[pos].members.push(member),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(RequestGroup {
                    key,
                    members: vec![member],
                });
            }
        }
    }

    groups
}
