//! Processing node contract and node metadata
//!
//! A node type is described by [`NodeMetadata`] (stable type name, palette
//! category, declared parameters, input arity) and implemented by a
//! [`ProcessingNode`], a pure function from ordered input artifacts plus the
//! instance's current parameter values to one output artifact.
//!
//! Implementations describe themselves through [`NodeDescriptor`] so the
//! behaviour and its metadata live side by side.
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{NodeDescriptor, NodeMetadata, NodeCategory, ProcessingNode};
//!
//! impl NodeDescriptor for InvertNode {
//!     fn descriptor() -> NodeMetadata {
//!         NodeMetadata::new("Invert", NodeCategory::Color)
//!             .with_description("Invert all samples")
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::artifact::Artifact;
use crate::error::Result;
use crate::parameter::{ParameterDescriptor, Parameters};
use crate::types::NodeCategory;

/// Type name of the distinguished source node
pub const INPUT_NODE_TYPE: &str = "Input";
/// Type name of the distinguished execution-target node
pub const OUTPUT_NODE_TYPE: &str = "Output";
/// Parameter holding the source path of an `Input` node
pub const INPUT_PATH_PARAM: &str = "filepath";

/// A unit of computation
///
/// `process` must be a pure function of `inputs` and `params`: the engine
/// caches its result and only calls it again after something upstream or a
/// parameter changed. Side effects such as loading a model file must be
/// idempotent. The engine never calls `process` with fewer than
/// [`NodeMetadata::min_inputs`] artifacts.
pub trait ProcessingNode: Send + Sync {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact>;
}

impl<F> ProcessingNode for F
where
    F: Fn(&[Arc<Artifact>], &Parameters) -> Result<Artifact> + Send + Sync,
{
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        self(inputs, params)
    }
}

/// Trait for node implementations that can describe their metadata
pub trait NodeDescriptor {
    /// Get the static metadata for this node type
    fn descriptor() -> NodeMetadata
    where
        Self: Sized;
}

/// Complete metadata for a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    /// Stable type identifier, e.g. "Gaussian Blur"
    pub node_type: String,
    /// Category for palette grouping
    pub category: NodeCategory,
    /// What the node does
    pub description: String,
    /// Declared parameters with their defaults
    pub parameters: Parameters,
    /// Number of upstream artifacts required before `process` can run
    pub min_inputs: usize,
}

impl NodeMetadata {
    /// Metadata for a single-input node without parameters
    pub fn new(node_type: impl Into<String>, category: NodeCategory) -> Self {
        let node_type = node_type.into();
        Self {
            parameters: Parameters::new(node_type.clone()),
            node_type,
            category,
            description: String::new(),
            min_inputs: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, descriptor: ParameterDescriptor) -> Self {
        self.parameters = self.parameters.with(name, descriptor);
        self
    }

    pub fn with_min_inputs(mut self, min_inputs: usize) -> Self {
        self.min_inputs = min_inputs;
        self
    }

    /// Whether this is the distinguished `Input` type
    pub fn is_input(&self) -> bool {
        self.node_type == INPUT_NODE_TYPE
    }

    /// Whether this is the distinguished `Output` type
    pub fn is_output(&self) -> bool {
        self.node_type == OUTPUT_NODE_TYPE
    }
}
