//! Error types for the node engine

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using NodeEngineError
pub type Result<T> = std::result::Result<T, NodeEngineError>;

/// Errors that can occur in the node engine
#[derive(Debug, Error)]
pub enum NodeEngineError {
    /// No constructor registered under this type name
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node id is not part of the graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Parameter name is not declared by the node
    #[error("Parameter '{name}' not found in node '{node_type}'")]
    UnknownParameter { node_type: String, name: String },

    /// Numeric parameter value outside its declared range
    #[error("Value {value} for parameter '{name}' is outside [{min}, {max}]")]
    ParameterOutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Parameter value does not match the declared semantic type
    #[error("Invalid value for parameter '{name}': expected {expected}")]
    ParameterTypeMismatch { name: String, expected: String },

    /// The edge already exists
    #[error("Nodes {from} and {to} are already connected")]
    DuplicateEdge { from: NodeId, to: NodeId },

    /// The edge would close a cycle
    #[error("Connecting {from} to {to} would create a cycle")]
    CycleRejected { from: NodeId, to: NodeId },

    /// A node's process step failed
    #[error("Error processing node {node_type}: {cause}")]
    ProcessingFailure { node_type: String, cause: String },

    /// Workflow document could not be parsed or is unusable
    #[error("Corrupt workflow: {0}")]
    CorruptWorkflow(String),

    /// A single batch item failed
    #[error("Batch item '{item}' failed: {cause}")]
    BatchItemFailure { item: String, cause: String },

    /// The graph is locked by a running execution
    #[error("Graph is busy with a running execution")]
    GraphBusy,

    /// Execution was cancelled
    #[error("Execution cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeEngineError {
    /// Create a processing failure for a node type
    pub fn processing(node_type: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ProcessingFailure {
            node_type: node_type.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a corrupt-workflow error from any displayable cause
    pub fn corrupt(cause: impl std::fmt::Display) -> Self {
        Self::CorruptWorkflow(cause.to_string())
    }

    /// Whether this error was raised synchronously by a structural edit
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnknownNodeType(_)
                | Self::UnknownNode(_)
                | Self::UnknownParameter { .. }
                | Self::DuplicateEdge { .. }
                | Self::CycleRejected { .. }
        )
    }
}
