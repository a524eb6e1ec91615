//! Binarization

use std::sync::Arc;

use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor, Parameters,
    ProcessingNode, Result,
};

use crate::pixels::to_gray;
use crate::primary_input;

/// Binary threshold on luma: samples above `threshold` become `max_value`,
/// the rest 0. Always produces a single-channel image.
#[derive(Debug, Default)]
pub struct ThresholdNode;

impl NodeDescriptor for ThresholdNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Threshold", NodeCategory::EdgesThreshold)
            .with_description("Binary threshold")
            .with_parameter("threshold", ParameterDescriptor::int(127, 0, 255))
            .with_parameter("max_value", ParameterDescriptor::int(255, 0, 255))
    }
}

impl ProcessingNode for ThresholdNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let gray = to_gray(primary_input(inputs, "Threshold")?)?;
        let threshold = params.int("threshold")?.clamp(0, 255) as u8;
        let max_value = params.int("max_value")?.clamp(0, 255) as u8;
        Ok(gray.map_samples(|v| if v > threshold { max_value } else { 0 }))
    }
}
