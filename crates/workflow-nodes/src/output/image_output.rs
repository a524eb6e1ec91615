//! Image Output Node
//!
//! Execution target marker. Passes its single input through unchanged.

use std::sync::Arc;

use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, Parameters, ProcessingNode, Result,
    OUTPUT_NODE_TYPE,
};

#[derive(Debug, Default)]
pub struct OutputNode;

impl NodeDescriptor for OutputNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new(OUTPUT_NODE_TYPE, NodeCategory::InputOutput)
            .with_description("Final result of the workflow")
    }
}

impl ProcessingNode for OutputNode {
    fn process(&self, inputs: &[Arc<Artifact>], _params: &Parameters) -> Result<Artifact> {
        Ok(crate::primary_input(inputs, OUTPUT_NODE_TYPE)?.as_ref().clone())
    }
}
