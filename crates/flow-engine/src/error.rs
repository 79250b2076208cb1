//! Error types for the flow engine

use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur in the flow engine
#[derive(Debug, Error)]
pub enum FlowError {
    /// The factory was asked for a block type that is not in the catalog
    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    /// A node referenced by an operation does not exist in the workflow
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A run is already in flight
    #[error("A workflow run is already in progress")]
    RunInProgress,

    /// The graph contains a cycle and the strict sort policy is active
    #[error("Cycle detected in workflow graph ({sorted} of {total} nodes ordered)")]
    CyclicGraph { sorted: usize, total: usize },

    /// A workflow file did not have the expected structure
    #[error("Malformed workflow file: {0}")]
    MalformedWorkflowFile(String),

    /// A block behavior failed
    #[error("Node execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a malformed workflow file error with a message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedWorkflowFile(msg.into())
    }
}
