//! Color adjustments

use std::sync::Arc;

use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor, Parameters,
    ProcessingNode, Result,
};

use crate::pixels::{saturate, to_gray};
use crate::primary_input;

/// Convert to single-channel luma
#[derive(Debug, Default)]
pub struct GrayscaleNode;

impl NodeDescriptor for GrayscaleNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Grayscale", NodeCategory::Color)
            .with_description("Convert image to grayscale")
    }
}

impl ProcessingNode for GrayscaleNode {
    fn process(&self, inputs: &[Arc<Artifact>], _params: &Parameters) -> Result<Artifact> {
        to_gray(primary_input(inputs, "Grayscale")?)
    }
}

/// Invert every sample
#[derive(Debug, Default)]
pub struct InvertNode;

impl NodeDescriptor for InvertNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Invert", NodeCategory::Color).with_description("Invert image colors")
    }
}

impl ProcessingNode for InvertNode {
    fn process(&self, inputs: &[Arc<Artifact>], _params: &Parameters) -> Result<Artifact> {
        Ok(primary_input(inputs, "Invert")?.map_samples(|v| 255 - v))
    }
}

/// `sample * contrast + brightness`, clamped
#[derive(Debug, Default)]
pub struct BrightnessContrastNode;

impl NodeDescriptor for BrightnessContrastNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Brightness/Contrast", NodeCategory::Color)
            .with_description("Adjust brightness and contrast")
            .with_parameter("brightness", ParameterDescriptor::int(0, -100, 100))
            .with_parameter("contrast", ParameterDescriptor::float(1.0, 0.1, 3.0).with_step(0.1))
    }
}

impl ProcessingNode for BrightnessContrastNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let brightness = params.int("brightness")? as f32;
        let contrast = params.float("contrast")? as f32;
        Ok(primary_input(inputs, "Brightness/Contrast")?
            .map_samples(|v| saturate(v as f32 * contrast + brightness)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::{Channels, ParamValue};

    #[test]
    fn test_grayscale() {
        let img = Arc::new(Artifact::new(1, 1, Channels::Rgb, vec![255, 0, 0]).unwrap());
        let out = GrayscaleNode.process(&[img], &GrayscaleNode::descriptor().parameters).unwrap();
        assert_eq!(out.channels(), Channels::Gray);
        assert_eq!(out.data(), &[76]);
    }

    #[test]
    fn test_invert() {
        let img = Arc::new(Artifact::filled(2, 1, Channels::Gray, 200));
        let out = InvertNode.process(&[img], &Parameters::default()).unwrap();
        assert_eq!(out.data(), &[55, 55]);
    }

    #[test]
    fn test_brightness_contrast_clamps() {
        let mut params = BrightnessContrastNode::descriptor().parameters;
        params.set("brightness", ParamValue::Int(50)).unwrap();
        params.set("contrast", ParamValue::Float(2.0)).unwrap();

        let img = Arc::new(Artifact::new(3, 1, Channels::Gray, vec![0, 50, 200]).unwrap());
        let out = BrightnessContrastNode.process(&[img], &params).unwrap();
        assert_eq!(out.data(), &[50, 150, 255]);
    }

    #[test]
    fn test_defaults_are_identity() {
        let img = Arc::new(Artifact::new(3, 1, Channels::Gray, vec![0, 50, 200]).unwrap());
        let params = BrightnessContrastNode::descriptor().parameters;
        let out = BrightnessContrastNode.process(&[img.clone()], &params).unwrap();
        assert_eq!(&out, img.as_ref());
    }
}
