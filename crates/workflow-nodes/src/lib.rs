//! Workflow Nodes
//!
//! Image processing node implementations for the Pixelgraph engine.
//! Each node is a pure transform from input images and parameter values to
//! one output image, composable into workflows.
//!
//! # Categories
//!
//! - **Input/Output**: `Input` loads a file, `Output` marks the target
//! - **Color**: grayscale conversion, inversion, brightness/contrast
//! - **Enhance**: sharpening, histogram equalization
//! - **Blur & Denoise**: Gaussian and median blur
//! - **Edges & Threshold**: binary threshold
//! - **Transform**: resizing
//! - **Composite**: two-image blending
//!
//! Images are RGB (or single-channel gray) everywhere; [`FsImageCodec`]
//! handles decoding and encoding at the file boundary.

use std::sync::Arc;

use node_engine::{Artifact, NodeEngineError, Result};

pub mod codec;
pub mod input;
pub mod output;
pub mod pixels;
pub mod processing;
pub mod setup;

pub use codec::{thumbnail_data_url, FsImageCodec};
pub use input::*;
pub use output::*;
pub use processing::*;
pub use setup::{builtin_registry, register_builtins};

/// First input slot, which every transform requires
pub(crate) fn primary_input<'a>(inputs: &'a [Arc<Artifact>], node_type: &str) -> Result<&'a Arc<Artifact>> {
    inputs
        .first()
        .ok_or_else(|| NodeEngineError::processing(node_type, "no input image"))
}
