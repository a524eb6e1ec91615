//! Geometric transforms

use std::sync::Arc;

use image::imageops::FilterType;
use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor, Parameters,
    ProcessingNode, Result,
};

use crate::codec::{from_dynamic, to_dynamic};
use crate::primary_input;

/// Resample `img` to exactly `width` x `height`, keeping its channel layout
pub fn resample(img: &Artifact, width: u32, height: u32) -> Result<Artifact> {
    if img.width() == width && img.height() == height {
        return Ok(img.clone());
    }
    let resized = to_dynamic(img)?.resize_exact(width, height, FilterType::Triangle);
    from_dynamic(resized, img.channels())
}

#[derive(Debug, Default)]
pub struct ResizeNode;

impl NodeDescriptor for ResizeNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Resize", NodeCategory::Transform)
            .with_description("Resize image")
            .with_parameter("width", ParameterDescriptor::int(512, 1, 4096))
            .with_parameter("height", ParameterDescriptor::int(512, 1, 4096))
    }
}

impl ProcessingNode for ResizeNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let img = primary_input(inputs, "Resize")?;
        let width = params.int("width")?.clamp(1, 4096) as u32;
        let height = params.int("height")?.clamp(1, 4096) as u32;
        resample(img, width, height)
    }
}
