//! Image Input Node
//!
//! Source of every workflow: loads the file named by its `filepath`
//! parameter through the configured [`ImageCodec`].

use std::path::Path;
use std::sync::Arc;

use node_engine::{
    Artifact, ImageCodec, NodeCategory, NodeEngineError, NodeMetadata, ParameterDescriptor,
    Parameters, ProcessingNode, Result, INPUT_NODE_TYPE, INPUT_PATH_PARAM,
};

/// Image Input Node
///
/// # Parameters
/// - `filepath` - image file to load; an empty path fails the node
///
/// # Output
/// The decoded image as 3-channel RGB
pub struct InputNode {
    codec: Arc<dyn ImageCodec>,
}

impl InputNode {
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        Self { codec }
    }

    pub fn metadata() -> NodeMetadata {
        NodeMetadata::new(INPUT_NODE_TYPE, NodeCategory::InputOutput)
            .with_description("Load an image from disk")
            .with_min_inputs(0)
            .with_parameter(INPUT_PATH_PARAM, ParameterDescriptor::file_path())
    }
}

impl ProcessingNode for InputNode {
    fn process(&self, _inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        let path = params.text(INPUT_PATH_PARAM)?;
        if path.is_empty() {
            return Err(NodeEngineError::processing(INPUT_NODE_TYPE, "no file selected"));
        }
        self.codec.read(Path::new(path))
    }
}
