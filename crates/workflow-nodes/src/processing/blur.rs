//! Smoothing filters

use std::sync::Arc;

use node_engine::{
    Artifact, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor, Parameters,
    ProcessingNode, Result,
};

use crate::pixels::{convolve_separable, odd_kernel, reflect};
use crate::primary_input;

/// Normalized 1D Gaussian weights for an odd `size`
///
/// Sigma is derived from the size: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

#[derive(Debug, Default)]
pub struct GaussianBlurNode;

impl NodeDescriptor for GaussianBlurNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Gaussian Blur", NodeCategory::BlurDenoise)
            .with_description("Apply Gaussian blur")
            .with_parameter("kernel_size", ParameterDescriptor::int(5, 1, 31).with_step(2.0))
    }
}

impl ProcessingNode for GaussianBlurNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let img = primary_input(inputs, "Gaussian Blur")?;
        let size = odd_kernel(params.int("kernel_size")?);
        convolve_separable(img, &gaussian_kernel(size))
    }
}

/// Per-channel median over a square window
#[derive(Debug, Default)]
pub struct MedianBlurNode;

impl NodeDescriptor for MedianBlurNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Median Blur", NodeCategory::BlurDenoise)
            .with_description("Remove salt-and-pepper noise")
            .with_parameter("kernel_size", ParameterDescriptor::int(5, 3, 31).with_step(2.0))
    }
}

impl ProcessingNode for MedianBlurNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let img = primary_input(inputs, "Median Blur")?;
        let size = odd_kernel(params.int("kernel_size")?);
        let radius = (size / 2) as isize;
        let (w, h, c) = (img.width() as usize, img.height() as usize, img.channels().count());
        let src = img.data();

        let mut window = Vec::with_capacity(size * size);
        let mut out = vec![0u8; src.len()];
        for y in 0..h {
            for x in 0..w {
                for ch in 0..c {
                    window.clear();
                    for dy in -radius..=radius {
                        let sy = reflect(y as isize + dy, h);
                        for dx in -radius..=radius {
                            let sx = reflect(x as isize + dx, w);
                            window.push(src[(sy * w + sx) * c + ch]);
                        }
                    }
                    let mid = window.len() / 2;
                    out[(y * w + x) * c + ch] = *window.select_nth_unstable(mid).1;
                }
            }
        }
        Artifact::new(img.width(), img.height(), img.channels(), out)
    }
}
