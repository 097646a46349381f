//! Query definitions for query-batch.
//!
//! A query type is a named [`QueryConfig`]: an optional output schema, a
//! compiler that turns a request into parameterized SQL, and a chain of
//! post-processing plugins. Configs live in an immutable [`QueryRegistry`].

pub mod placeholder;
pub mod plugins;
pub mod registry;
pub mod safety;
pub mod template;

pub use plugins::{apply_plugins, Plugin};
pub use registry::{QueryRegistry, RegistryBuilder};
pub use template::{QueryDefinition, TemplateCompiler};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::batch::{BatchOptions, BatchRequest};
use crate::error::Result;
use crate::store::Params;

/// One column of a query's declared output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    /// Column name.
    pub name: String,

    /// Column type as the store reports it (e.g. `String`, `UInt64`).
    #[serde(rename = "type")]
    pub field_type: String,
}

impl OutputField {
    /// Creates a new output field.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// SQL and parameters produced for a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Params,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Turns a request into parameterized SQL.
///
/// Compilation is pure: it must not touch the store. The request passed in
/// already carries the effective timezone if the caller or the batch supplied
/// one; compilers fill in their own default otherwise.
pub trait QueryCompiler: fmt::Debug + Send + Sync {
    fn compile(&self, request: &BatchRequest, options: &BatchOptions) -> Result<CompiledQuery>;
}

/// A registered query type.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    name: String,
    output_fields: Option<Vec<OutputField>>,
    compiler: Arc<dyn QueryCompiler>,
    plugins: Vec<Plugin>,
}

impl QueryConfig {
    /// Creates a config with no declared output schema and no plugins.
    pub fn new(name: impl Into<String>, compiler: Arc<dyn QueryCompiler>) -> Self {
        Self {
            name: name.into(),
            output_fields: None,
            compiler,
            plugins: Vec::new(),
        }
    }

    /// Declares the output schema.
    pub fn with_output_fields(mut self, fields: Vec<OutputField>) -> Self {
        self.output_fields = Some(fields);
        self
    }

    /// Sets the post-processing chain.
    pub fn with_plugins(mut self, plugins: Vec<Plugin>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_fields(&self) -> Option<&[OutputField]> {
        self.output_fields.as_deref()
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Compiles a request with this config's compiler.
    pub fn compile(&self, request: &BatchRequest, options: &BatchOptions) -> Result<CompiledQuery> {
        self.compiler.compile(request, options)
    }
}
