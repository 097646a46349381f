//! Error types for query-batch.
//!
//! Defines the error enum returned by every internal operation. The batch
//! orchestrator matches on these variants to decide between reporting a
//! per-request error and falling back to individual execution.

use thiserror::Error;

/// Main error type for batch query operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The requested query type is not present in the registry.
    #[error("Unknown query type: {0}")]
    UnknownType(String),

    /// A request could not be turned into SQL and parameters.
    #[error("Compile error: {0}")]
    Compile(String),

    /// The store rejected or failed to run a query (syntax, binding, timeout).
    #[error("Query error: {0}")]
    Execution(String),

    /// A merged result set could not be demultiplexed.
    #[error("Split error: {0}")]
    Split(String),

    /// The store could not be reached (host unreachable, auth failed, etc.)
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors (invalid config file, bad query definitions, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// Creates an unknown query type error.
    pub fn unknown_type(query_type: impl Into<String>) -> Self {
        Self::UnknownType(query_type.into())
    }

    /// Creates a compile error with the given message.
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a split error with the given message.
    pub fn split(msg: impl Into<String>) -> Self {
        Self::Split(msg.into())
    }

    /// Creates a store connectivity error with the given message.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownType(_) => "Unknown Query Type",
            Self::Compile(_) => "Compile Error",
            Self::Execution(_) => "Query Error",
            Self::Split(_) => "Split Error",
            Self::Store(_) => "Store Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using BatchError.
pub type Result<T> = std::result::Result<T, BatchError>;
