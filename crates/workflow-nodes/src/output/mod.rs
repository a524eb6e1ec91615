//! Output nodes

mod image_output;

pub use image_output::OutputNode;
