//! Image transforms, grouped by palette category

mod blur;
mod color;
mod enhance;
mod mix;
mod resize;
mod threshold;

pub use blur::{GaussianBlurNode, MedianBlurNode};
pub use color::{BrightnessContrastNode, GrayscaleNode, InvertNode};
pub use enhance::{EqualizeHistNode, SharpenNode};
pub use mix::MixNode;
pub use resize::ResizeNode;
pub use threshold::ThresholdNode;
