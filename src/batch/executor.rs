//! Batch orchestration.
//!
//! Runs a list of requests with as few store round trips as possible: requests
//! whose types share a schema signature are merged into one `UNION ALL`
//! query, everything else runs alone. A failed merge falls back to running
//! each of its requests individually. Results always come back one per
//! request, in request order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::grouper::{group_by_schema, GroupMember};
use super::introspect;
use super::runner::run_single;
use super::signature::SchemaSignature;
use super::splitter::split_results;
use super::union::build_union_query;
use super::{BatchOptions, BatchRequest, BatchResult};
use crate::error::Result;
use crate::query::{apply_plugins, QueryRegistry};
use crate::store::AnalyticsStore;

/// Executes batches against one store with one registry.
///
/// Holds no per-batch state; a single executor can serve concurrent batches.
#[derive(Clone)]
pub struct BatchExecutor {
    registry: Arc<QueryRegistry>,
    store: Arc<dyn AnalyticsStore>,
}

impl BatchExecutor {
    /// Creates an executor.
    pub fn new(registry: Arc<QueryRegistry>, store: Arc<dyn AnalyticsStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Runs every request and returns one result per request, in order.
    pub async fn execute(
        &self,
        requests: &[BatchRequest],
        options: &BatchOptions,
    ) -> Vec<BatchResult> {
        match requests {
            [] => return Vec::new(),
            [only] => return vec![self.run_single(only, options).await],
            _ => {}
        }

        let start = Instant::now();
        let mut slots: Vec<Option<BatchResult>> = vec![None; requests.len()];

        for (index, request) in requests.iter().enumerate() {
            if !self.registry.contains(&request.query_type) {
                slots[index] = Some(self.run_single(request, options).await);
            }
        }

        let groups = group_by_schema(&self.registry, requests);
        let merged_groups = groups.iter().filter(|g| g.len() > 1).count();
        debug!(
            "Batch of {} requests split into {} groups ({} merged)",
            requests.len(),
            groups.len(),
            merged_groups
        );

        for group in &groups {
            if let [member] = group.members.as_slice() {
                slots[member.index] = Some(self.run_single(member.request, options).await);
                continue;
            }

            match self.run_merged(&group.members, options).await {
                Ok(results) => {
                    for (member, result) in group.members.iter().zip(results) {
                        slots[member.index] = Some(result);
                    }
                }
                Err(e) => {
                    warn!(
                        "Merged query for {} requests failed, running them individually: {}",
                        group.len(),
                        e
                    );
                    for member in &group.members {
                        slots[member.index] = Some(self.run_single(member.request, options).await);
                    }
                }
            }
        }

        let results: Vec<BatchResult> = slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| slot.unwrap_or_else(|| BatchResult::empty(&request.query_type)))
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            requests = results.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch executed"
        );

        results
    }

    /// Runs one request on its own.
    pub async fn run_single(&self, request: &BatchRequest, options: &BatchOptions) -> BatchResult {
        run_single(&self.registry, self.store.as_ref(), request, options).await
    }

    /// Runs a group as one merged query; results follow member order.
    async fn run_merged(
        &self,
        members: &[GroupMember<'_>],
        options: &BatchOptions,
    ) -> Result<Vec<BatchResult>> {
        let requests: Vec<&BatchRequest> = members.iter().map(|m| m.request).collect();
        let union = build_union_query(&self.registry, &requests, options)?;
        let rows = self.store.query(&union.sql, &union.params).await?;
        let mut split = split_results(rows, &union.types)?;

        Ok(union
            .types
            .iter()
            .map(|query_type| {
                let raw = split.remove(query_type).unwrap_or_default();
                let data = match self.registry.get(query_type) {
                    Some(config) => apply_plugins(raw, config, options.website_domain.as_deref()),
                    None => raw,
                };
                BatchResult::success(query_type, data)
            })
            .collect())
    }

    /// See [`introspect::is_compatible`].
    pub fn is_compatible(&self, a: &str, b: &str) -> bool {
        introspect::is_compatible(&self.registry, a, b)
    }

    /// See [`introspect::compatible_types_of`].
    pub fn compatible_types_of(&self, query_type: &str) -> Vec<String> {
        introspect::compatible_types_of(&self.registry, query_type)
    }

    /// See [`introspect::all_schema_groups`].
    pub fn all_schema_groups(&self) -> BTreeMap<SchemaSignature, Vec<String>> {
        introspect::all_schema_groups(&self.registry)
    }
}
