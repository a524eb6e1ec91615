//! Stub nodes shared by the engine's unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::artifact::{Artifact, Channels};
use crate::descriptor::{
    NodeMetadata, ProcessingNode, INPUT_NODE_TYPE, INPUT_PATH_PARAM, OUTPUT_NODE_TYPE,
};
use crate::error::{NodeEngineError, Result};
use crate::parameter::{ParameterDescriptor, Parameters};
use crate::registry::NodeRegistry;
use crate::types::NodeCategory;

/// `process` call counts per node type
#[derive(Clone, Default)]
pub struct CallCounts {
    counts: HashMap<&'static str, Arc<AtomicUsize>>,
}

impl CallCounts {
    fn counter(&mut self, node_type: &'static str) -> Arc<AtomicUsize> {
        self.counts.entry(node_type).or_default().clone()
    }

    pub fn get(&self, node_type: &str) -> usize {
        self.counts
            .get(node_type)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

struct Counted<F> {
    calls: Arc<AtomicUsize>,
    f: F,
}

impl<F> ProcessingNode for Counted<F>
where
    F: Fn(&[Arc<Artifact>], &Parameters) -> Result<Artifact> + Send + Sync,
{
    fn process(&self, inputs: &[Arc<Artifact>], params: &Parameters) -> Result<Artifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(inputs, params)
    }
}

/// Registry with `Input`, `Add`, `Blend`, `Fail` and `Output` stub types
///
/// - `Input` emits a 2x2 gray image filled with its `value` parameter and
///   fails when `filepath` starts with "bad".
/// - `Add` adds `amount` to every sample.
/// - `Blend` averages its two inputs.
/// - `Fail` always fails.
pub fn stub_registry() -> (Arc<NodeRegistry>, CallCounts) {
    let mut counts = CallCounts::default();
    let mut builder = NodeRegistry::builder();

    builder.register_shared(
        NodeMetadata::new(INPUT_NODE_TYPE, NodeCategory::InputOutput)
            .with_min_inputs(0)
            .with_parameter(INPUT_PATH_PARAM, ParameterDescriptor::file_path())
            .with_parameter("value", ParameterDescriptor::int(10, 0, 255)),
        Arc::new(Counted {
            calls: counts.counter(INPUT_NODE_TYPE),
            f: |_: &[Arc<Artifact>], params: &Parameters| -> Result<Artifact> {
                let path = params.text(INPUT_PATH_PARAM)?;
                if path.starts_with("bad") {
                    return Err(NodeEngineError::processing(
                        INPUT_NODE_TYPE,
                        format!("could not load image from {path}"),
                    ));
                }
                let value = params.int("value")? as u8;
                Ok(Artifact::filled(2, 2, Channels::Gray, value))
            },
        }),
    );

    builder.register_shared(
        NodeMetadata::new("Add", NodeCategory::Color)
            .with_parameter("amount", ParameterDescriptor::int(1, 0, 100)),
        Arc::new(Counted {
            calls: counts.counter("Add"),
            f: |inputs: &[Arc<Artifact>], params: &Parameters| -> Result<Artifact> {
                let amount = params.int("amount")? as u8;
                Ok(inputs[0].map_samples(|v| v.saturating_add(amount)))
            },
        }),
    );

    builder.register_shared(
        NodeMetadata::new("Blend", NodeCategory::Composite).with_min_inputs(2),
        Arc::new(Counted {
            calls: counts.counter("Blend"),
            f: |inputs: &[Arc<Artifact>], _: &Parameters| -> Result<Artifact> {
                let (a, b) = (&inputs[0], &inputs[1]);
                let data = a
                    .data()
                    .iter()
                    .zip(b.data())
                    .map(|(&x, &y)| ((x as u16 + y as u16) / 2) as u8)
                    .collect();
                Artifact::new(a.width(), a.height(), a.channels(), data)
            },
        }),
    );

    builder.register_shared(
        NodeMetadata::new("Fail", NodeCategory::Uncategorized),
        Arc::new(Counted {
            calls: counts.counter("Fail"),
            f: |_: &[Arc<Artifact>], _: &Parameters| -> Result<Artifact> {
                Err(NodeEngineError::processing("Fail", "wrong channel count"))
            },
        }),
    );

    builder.register_shared(
        NodeMetadata::new(OUTPUT_NODE_TYPE, NodeCategory::InputOutput),
        Arc::new(Counted {
            calls: counts.counter(OUTPUT_NODE_TYPE),
            f: |inputs: &[Arc<Artifact>], _: &Parameters| -> Result<Artifact> {
                Ok(inputs[0].as_ref().clone())
            },
        }),
    );

    (Arc::new(builder.build()), counts)
}
