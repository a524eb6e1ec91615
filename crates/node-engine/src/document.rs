//! Workflow documents
//!
//! A [`WorkflowDocument`] is the persisted, value-type snapshot of a graph:
//! node types and parameter values, edges, execution hints naming the input
//! and output roles, plus metadata and presentation layout. Documents are
//! produced with [`WorkflowDocument::from_graph`] and turned back into a
//! live graph with [`Graph::recreate_from_document`], which mints fresh ids
//! and returns the old-to-new mapping.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{NodeEngineError, Result};
use crate::graph::Graph;
use crate::parameter::{ParamValue, ParameterDescriptor, ParameterKind};
use crate::types::{IdRemap, NodeId};

/// Format version written into every document
pub const DOCUMENT_VERSION: &str = "1.0";

/// Default node width and height when no layout is known
pub const DEFAULT_NODE_SIZE: (f64, f64) = (180.0, 100.0);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: DEFAULT_NODE_SIZE.0,
            height: DEFAULT_NODE_SIZE.1,
        }
    }
}

/// Presentation state of one node, opaque to the engine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeLayout {
    pub position: Position,
    pub size: Size,
}

/// Document metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// `data:image/png;base64,...` preview of the output
    #[serde(default)]
    pub thumbnail: Option<String>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// Accept RFC 3339 as well as naive ISO 8601 timestamps, the latter as UTC
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl WorkflowMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            created_at: now,
            updated_at: now,
            thumbnail: None,
        }
    }
}

/// Snapshot of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub value: serde_json::Value,
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    #[serde(default)]
    pub step: Option<f64>,
}

impl From<&ParameterDescriptor> for ParameterSnapshot {
    fn from(descriptor: &ParameterDescriptor) -> Self {
        Self {
            kind: descriptor.kind,
            value: descriptor.value.to_json(),
            range: descriptor.range.map(|(min, max)| [min, max]),
            step: descriptor.step,
        }
    }
}

/// Snapshot of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSnapshot>,
}

/// Snapshot of one edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub from_node: String,
    pub to_node: String,
}

/// Which nodes act as batch inputs and as the execution target
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionHints {
    #[serde(default)]
    pub output_node_id: Option<String>,
    #[serde(default)]
    pub input_node_ids: Vec<String>,
}

/// Persisted form of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub metadata: WorkflowMetadata,
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub connections: Vec<ConnectionSnapshot>,
    #[serde(default)]
    pub execution: ExecutionHints,
}

impl WorkflowDocument {
    /// Snapshot `graph` under `name`
    ///
    /// Nodes missing from `layout` get the default position and size.
    /// Every `Input` node becomes an input role and the first `Output` node
    /// the output role; use [`with_execution`](Self::with_execution) to
    /// override.
    pub fn from_graph(
        graph: &Graph,
        name: impl Into<String>,
        layout: &HashMap<NodeId, NodeLayout>,
    ) -> Self {
        let mut nodes: Vec<_> = graph.nodes().collect();
        nodes.sort_by_key(|n| n.id());

        let snapshots = nodes
            .iter()
            .map(|node| {
                let place = layout.get(&node.id()).copied().unwrap_or_default();
                NodeSnapshot {
                    id: node.id().to_string(),
                    node_type: node.node_type().to_string(),
                    position: place.position,
                    size: place.size,
                    parameters: node
                        .parameters()
                        .iter()
                        .map(|(name, descriptor)| (name.clone(), descriptor.into()))
                        .collect(),
                }
            })
            .collect();

        let connections = nodes
            .iter()
            .flat_map(|node| {
                node.inputs().iter().map(move |src| ConnectionSnapshot {
                    from_node: src.to_string(),
                    to_node: node.id().to_string(),
                })
            })
            .collect();

        let execution = ExecutionHints {
            output_node_id: nodes
                .iter()
                .find(|n| n.metadata().is_output())
                .map(|n| n.id().to_string()),
            input_node_ids: nodes
                .iter()
                .filter(|n| n.metadata().is_input())
                .map(|n| n.id().to_string())
                .collect(),
        };

        Self {
            metadata: WorkflowMetadata::new(name),
            nodes: snapshots,
            connections,
            execution,
        }
    }

    /// Replace the derived execution hints
    pub fn with_execution(mut self, output: Option<NodeId>, inputs: &[NodeId]) -> Self {
        self.execution = ExecutionHints {
            output_node_id: output.map(|id| id.to_string()),
            input_node_ids: inputs.iter().map(ToString::to_string).collect(),
        };
        self
    }

    /// Parse a document, reporting malformed input as `CorruptWorkflow`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(NodeEngineError::corrupt)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Layout of the recreated nodes, keyed by their new ids
    pub fn layout(&self, remap: &IdRemap) -> HashMap<NodeId, NodeLayout> {
        self.nodes
            .iter()
            .filter_map(|snap| {
                remap.get(&snap.id).map(|&id| {
                    (
                        id,
                        NodeLayout {
                            position: snap.position,
                            size: snap.size,
                        },
                    )
                })
            })
            .collect()
    }

    /// The output role translated through `remap`
    pub fn output_node(&self, remap: &IdRemap) -> Option<NodeId> {
        self.execution
            .output_node_id
            .as_ref()
            .and_then(|old| remap.get(old).copied())
    }

    /// The input roles translated through `remap`, unresolvable ids dropped
    pub fn input_nodes(&self, remap: &IdRemap) -> Vec<NodeId> {
        self.execution
            .input_node_ids
            .iter()
            .filter_map(|old| remap.get(old).copied())
            .collect()
    }
}

impl Graph {
    /// Replace the graph's contents with the nodes and edges of `doc`
    ///
    /// Every node gets a fresh id and starts dirty. Unknown node types,
    /// unusable parameter values and edges referring to skipped nodes are
    /// logged and skipped rather than failing the whole load.
    pub fn recreate_from_document(&mut self, doc: &WorkflowDocument) -> IdRemap {
        self.clear();
        let mut remap = IdRemap::new();

        for snap in &doc.nodes {
            let id = match self.add_node(&snap.node_type) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Skipping node '{}' in workflow '{}': {}", snap.id, doc.metadata.name, e);
                    continue;
                }
            };
            if let Some(node) = self.node_mut(id) {
                let params = node.parameters_mut();
                for (name, saved) in &snap.parameters {
                    let Some(kind) = params.get(name).map(|d| d.kind) else {
                        log::warn!("Ignoring unknown parameter '{}' on '{}'", name, snap.node_type);
                        continue;
                    };
                    let restored = ParamValue::from_json(kind, &saved.value)
                        .ok_or_else(|| NodeEngineError::ParameterTypeMismatch {
                            name: name.clone(),
                            expected: kind.to_string(),
                        })
                        .and_then(|value| params.set(name, value));
                    if let Err(e) = restored {
                        log::warn!("Keeping default for '{}' on '{}': {}", name, snap.node_type, e);
                    }
                }
            }
            remap.insert(snap.id.clone(), id);
        }

        for edge in &doc.connections {
            let (Some(&src), Some(&dst)) = (remap.get(&edge.from_node), remap.get(&edge.to_node)) else {
                log::warn!(
                    "Skipping connection {} -> {}: node not found",
                    edge.from_node,
                    edge.to_node
                );
                continue;
            };
            if let Err(e) = self.connect(src, dst) {
                log::warn!("Skipping connection {} -> {}: {}", edge.from_node, edge.to_node, e);
            }
        }

        log::debug!(
            "Recreated workflow '{}' with {} node(s) and {} edge(s)",
            doc.metadata.name,
            self.len(),
            self.edges().len()
        );
        remap
    }
}
