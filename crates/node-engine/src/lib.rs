//! Node Engine - dirty-tracking, memoized image processing graphs
//!
//! This crate provides the computation core of Pixelgraph: processing
//! nodes wired into a DAG, each caching its output image until something
//! upstream changes. It supports:
//!
//! - Dirty propagation on parameter and edge changes
//! - Memoized evaluation that only recomputes stale ancestors
//! - Progress events and cooperative cancellation on a worker thread
//! - Workflow documents persisted as JSON
//! - Batch runs of one workflow over many input files
//!
//! # Architecture
//!
//! - `NodeRegistry`: type name to metadata and processor factory
//! - `Graph`: arena of nodes joined by id lists, owning all dirty/cache state
//! - `Scheduler`: ordered evaluation with `EventSink` progress reporting
//! - `GraphSession`: single-worker ownership of an editor's live graph
//! - `WorkflowDocument` / `WorkflowStore`: persistence
//! - `BatchRunner`: per-input throwaway graphs with failure isolation
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{Graph, NodeRegistry};
//!
//! let mut builder = NodeRegistry::builder();
//! workflow_nodes::register_builtins(&mut builder, codec);
//! let mut graph = Graph::new(Arc::new(builder.build()));
//!
//! let input = graph.add_node("Input")?;
//! let blur = graph.add_node("Gaussian Blur")?;
//! graph.connect(input, blur)?;
//! let image = graph.execute(blur)?;
//! ```

pub mod artifact;
pub mod batch;
pub mod codec;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod events;
pub mod graph;
pub mod parameter;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use artifact::{Artifact, Channels};
pub use batch::{BatchFailure, BatchOutput, BatchReport, BatchRunner};
pub use codec::ImageCodec;
pub use descriptor::{
    NodeDescriptor, NodeMetadata, ProcessingNode, INPUT_NODE_TYPE, INPUT_PATH_PARAM,
    OUTPUT_NODE_TYPE,
};
pub use document::{NodeLayout, Position, Size, WorkflowDocument, WorkflowMetadata};
pub use error::{NodeEngineError, Result};
pub use events::{ChannelEventSink, EventSink, ExecutionEvent, NullEventSink, VecEventSink};
pub use graph::{Graph, GraphNode};
pub use parameter::{ParamValue, ParameterDescriptor, ParameterKind, Parameters};
pub use registry::{NodeFactory, NodeRegistry, RegistryBuilder};
pub use scheduler::{CancellationFlag, Scheduler};
pub use session::GraphSession;
pub use store::{WorkflowStore, WorkflowSummary};
pub use types::{IdRemap, NodeCategory, NodeId};
