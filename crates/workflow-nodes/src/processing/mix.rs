//! Blending of two images

use std::sync::Arc;

use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor, Parameters,
    ProcessingNode, Result,
};

use super::resize::resample;
use crate::pixels::{add_weighted, with_channels};
use crate::primary_input;

/// `first * (1 - factor) + second * factor`
///
/// The second slot is resampled and converted to match the first. With a
/// single connected input the node passes it through.
#[derive(Debug, Default)]
pub struct MixNode;

impl NodeDescriptor for MixNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Mix (Blend)", NodeCategory::Composite)
            .with_description("Mix two images together")
            .with_parameter("factor", ParameterDescriptor::float(0.5, 0.0, 1.0).with_step(0.05))
    }
}

impl ProcessingNode for MixNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let first = primary_input(inputs, "Mix (Blend)")?;
        let Some(second) = inputs.get(1) else {
            return Ok(first.as_ref().clone());
        };
        if inputs.len() > 2 {
            log::debug!("Mix (Blend) ignores {} extra input(s)", inputs.len() - 2);
        }

        let factor = params.float("factor")? as f32;
        let second = resample(second, first.width(), first.height())?;
        let second = with_channels(&second, first.channels())?;
        add_weighted(first, 1.0 - factor, &second, factor)
    }
}
