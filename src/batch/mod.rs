//! Batch query execution.
//!
//! Accepts heterogeneous analytics requests and executes them with minimal
//! round trips by merging requests whose result rows share a shape.

mod executor;
mod grouper;
mod introspect;
mod request;
mod runner;
mod signature;
mod splitter;
mod union;

pub use executor::BatchExecutor;
pub use grouper::{group_by_schema, GroupKey, GroupMember, RequestGroup};
pub use introspect::{all_schema_groups, compatible_types_of, is_compatible};
pub use request::{BatchOptions, BatchRequest, BatchResult, Filter, FilterOp};
pub use runner::run_single;
pub use signature::{schema_signature, SchemaSignature};
pub use splitter::split_results;
pub use union::{build_union_query, CompiledUnionQuery, DISCRIMINATOR_COLUMN, UNION_SEPARATOR};
