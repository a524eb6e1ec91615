//! Built-in node registration
//!
//! Hosts call [`register_builtins`] once at startup to populate their
//! registry with every node in this crate, or [`builtin_registry`] when
//! they need nothing else.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = node_engine::NodeRegistry::builder();
//! workflow_nodes::register_builtins(&mut builder, Arc::new(FsImageCodec));
//! let registry = Arc::new(builder.build());
//! ```

use std::sync::Arc;

use node_engine::{ImageCodec, NodeRegistry, ProcessingNode, RegistryBuilder};

use crate::input::InputNode;
use crate::output::OutputNode;
use crate::processing::{
    BrightnessContrastNode, EqualizeHistNode, GaussianBlurNode, GrayscaleNode, InvertNode,
    MedianBlurNode, MixNode, ResizeNode, SharpenNode, ThresholdNode,
};

/// Register every built-in node type; `codec` backs the `Input` node
pub fn register_builtins(builder: &mut RegistryBuilder, codec: Arc<dyn ImageCodec>) {
    let input: Arc<dyn ProcessingNode> = Arc::new(InputNode::new(codec));
    builder
        .register_shared(InputNode::metadata(), input)
        .register::<OutputNode>()
        .register::<GrayscaleNode>()
        .register::<InvertNode>()
        .register::<BrightnessContrastNode>()
        .register::<SharpenNode>()
        .register::<EqualizeHistNode>()
        .register::<GaussianBlurNode>()
        .register::<MedianBlurNode>()
        .register::<ThresholdNode>()
        .register::<ResizeNode>()
        .register::<MixNode>();
}

/// A registry holding exactly the built-in node types
pub fn builtin_registry(codec: Arc<dyn ImageCodec>) -> Arc<NodeRegistry> {
    let mut builder = NodeRegistry::builder();
    register_builtins(&mut builder, codec);
    Arc::new(builder.build())
}
