//! Detail and contrast enhancement

use std::sync::Arc;

use node_engine::{
    Artifact, Channels, NodeCategory, NodeDescriptor, NodeMetadata, ParameterDescriptor,
    Parameters, ProcessingNode, Result,
};

use crate::pixels::{add_weighted, convolve_square, saturate};
use crate::primary_input;

const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Blend the image with a 3x3 sharpened copy
///
/// `strength` 1.0 yields the fully sharpened image; larger values
/// extrapolate past it.
#[derive(Debug, Default)]
pub struct SharpenNode;

impl NodeDescriptor for SharpenNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Sharpen", NodeCategory::Enhance)
            .with_description("Sharpen image details")
            .with_parameter("strength", ParameterDescriptor::float(1.0, 0.1, 5.0).with_step(0.1))
    }
}

impl ProcessingNode for SharpenNode {
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let img = primary_input(inputs, "Sharpen")?;
        let strength = params.float("strength")? as f32;
        let sharpened = convolve_square(img, &SHARPEN_KERNEL, 3)?;
        add_weighted(img, 1.0 - strength, &sharpened, strength)
    }
}

/// Histogram equalization
///
/// Color images are equalized on the luma channel in YCrCb so hues are
/// preserved.
#[derive(Debug, Default)]
pub struct EqualizeHistNode;

impl NodeDescriptor for EqualizeHistNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata::new("Equalize Hist", NodeCategory::Enhance)
            .with_description("Histogram equalization for contrast enhancement")
    }
}

impl ProcessingNode for EqualizeHistNode {
    fn process(&self, inputs: &[Arc<Artifact>], _params: &Parameters) -> Result<Artifact> {
        let img = primary_input(inputs, "Equalize Hist")?;
        match img.channels() {
            Channels::Gray => {
                let lut = equalization_lut(img.data().iter().copied());
                Ok(img.map_samples(|v| lut[v as usize]))
            }
            Channels::Rgb => equalize_luma(img),
        }
    }
}

/// Lookup table spreading the cumulative histogram over 0..=255
fn equalization_lut(samples: impl Iterator<Item = u8>) -> [u8; 256] {
    let mut hist = [0usize; 256];
    let mut total = 0usize;
    for v in samples {
        hist[v as usize] += 1;
        total += 1;
    }

    let mut lut = [0u8; 256];
    let first = hist.iter().copied().find(|&n| n > 0).unwrap_or(0);
    if total == first {
        // single intensity: nothing to spread
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    }

    let scale = 255.0 / (total - first) as f32;
    let mut cdf = 0usize;
    for (i, slot) in lut.iter_mut().enumerate() {
        cdf += hist[i];
        *slot = saturate(cdf.saturating_sub(first) as f32 * scale);
    }
    lut
}

fn equalize_luma(img: &Artifact) -> Result<Artifact> {
    let ycc: Vec<[f32; 3]> = img
        .data()
        .chunks_exact(3)
        .map(|px| {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            [y, (r - y) * 0.713 + 128.0, (b - y) * 0.564 + 128.0]
        })
        .collect();

    let lut = equalization_lut(ycc.iter().map(|p| saturate(p[0])));
    let data = ycc
        .iter()
        .flat_map(|&[y, cr, cb]| {
            let y = lut[saturate(y) as usize] as f32;
            [
                saturate(y + 1.403 * (cr - 128.0)),
                saturate(y - 0.714 * (cr - 128.0) - 0.344 * (cb - 128.0)),
                saturate(y + 1.773 * (cb - 128.0)),
            ]
        })
        .collect();
    Artifact::new(img.width(), img.height(), Channels::Rgb, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_engine::ParamValue;

    #[test]
    fn test_equalize_stretches_range() {
        let img = Arc::new(Artifact::new(4, 1, Channels::Gray, vec![100, 110, 120, 130]).unwrap());
        let out = EqualizeHistNode.process(&[img], &Parameters::default()).unwrap();
        assert_eq!(out.data(), &[0, 85, 170, 255]);
    }

    #[test]
    fn test_equalize_flat_image_unchanged() {
        let img = Arc::new(Artifact::filled(3, 3, Channels::Rgb, 90));
        let out = EqualizeHistNode.process(&[img.clone()], &Parameters::default()).unwrap();
        assert_eq!(out.shape(), img.shape());
        assert!(out.data().iter().all(|&v| v.abs_diff(90) <= 1));
    }

    #[test]
    fn test_sharpen_flat_image_unchanged() {
        let img = Arc::new(Artifact::filled(4, 4, Channels::Rgb, 120));
        let out = SharpenNode
            .process(&[img.clone()], &SharpenNode::descriptor().parameters)
            .unwrap();
        assert_eq!(&out, img.as_ref());
    }

    #[test]
    fn test_sharpen_boosts_edges() {
        let img = Arc::new(Artifact::new(3, 1, Channels::Gray, vec![100, 150, 100]).unwrap());
        let mut params = SharpenNode::descriptor().parameters;
        params.set("strength", ParamValue::Float(1.0)).unwrap();

        let out = SharpenNode.process(&[img], &params).unwrap();
        assert!(out.data()[1] > 150);
        assert!(out.data()[0] < 100);
    }
}
