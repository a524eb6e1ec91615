//! Input nodes

mod image_input;

pub use image_input::InputNode;
