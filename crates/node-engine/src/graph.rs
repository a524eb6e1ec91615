//! The node graph: an arena of node instances joined by directed edges
//!
//! Edges are stored twice, as the destination's ordered input list and the
//! source's output list, both holding [`NodeId`]s into the graph's node
//! table. The graph is the sole owner of every node.
//!
//! Each node carries a cached artifact and a dirty flag. A dirty node never
//! has a cache. Any change that can affect a node's output (a parameter
//! change, a new or removed upstream edge) marks that node and every node
//! downstream of it dirty, dropping their caches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::artifact::Artifact;
use crate::descriptor::{NodeMetadata, ProcessingNode};
use crate::error::{NodeEngineError, Result};
use crate::parameter::{ParamValue, Parameters};
use crate::registry::NodeRegistry;
use crate::types::NodeId;

/// A node instance inside a [`Graph`]
pub struct GraphNode {
    id: NodeId,
    metadata: Arc<NodeMetadata>,
    processor: Arc<dyn ProcessingNode>,
    parameters: Parameters,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    cache: Option<Arc<Artifact>>,
    dirty: bool,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> &str {
        &self.metadata.node_type
    }

    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Upstream nodes in input-slot order
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Downstream nodes
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn cached(&self) -> Option<&Arc<Artifact>> {
        self.cache.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clean nodes with a cache can be returned without recomputation
    pub fn is_fresh(&self) -> bool {
        !self.dirty && self.cache.is_some()
    }

    pub(crate) fn processor(&self) -> &Arc<dyn ProcessingNode> {
        &self.processor
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
        self.cache = None;
    }

    pub(crate) fn store(&mut self, artifact: Arc<Artifact>) {
        self.cache = Some(artifact);
        self.dirty = false;
    }
}

impl std::fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("node_type", &self.metadata.node_type)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("cached", &self.cache.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Dependency-aware computation graph
pub struct Graph {
    registry: Arc<NodeRegistry>,
    nodes: HashMap<NodeId, GraphNode>,
}

impl Graph {
    /// Create an empty graph constructing nodes from `registry`
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            nodes: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Construct a node of `node_type` with default parameters
    ///
    /// The new node starts dirty, uncached and unconnected.
    pub fn add_node(&mut self, node_type: &str) -> Result<NodeId> {
        let constructed = self.registry.construct(node_type)?;
        let id = NodeId::new();
        self.nodes.insert(
            id,
            GraphNode {
                id,
                metadata: constructed.metadata,
                processor: constructed.processor,
                parameters: constructed.parameters,
                inputs: Vec::new(),
                outputs: Vec::new(),
                cache: None,
                dirty: true,
            },
        );
        log::debug!("Added node '{}' ({})", node_type, id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&GraphNode> {
        self.nodes.get(&id).ok_or(NodeEngineError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Ids of all nodes of the given type
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes
            .values()
            .filter(move |n| n.node_type() == node_type)
            .map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every edge as (source, destination), grouped by destination in
    /// input-slot order
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .values()
            .flat_map(|node| node.inputs.iter().map(move |&src| (src, node.id)))
            .collect()
    }

    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.nodes
            .get(&dst)
            .map(|n| n.inputs.contains(&src))
            .unwrap_or(false)
    }

    /// Feed the output of `src` into the next input slot of `dst`
    ///
    /// Rejected without touching the graph when either node is unknown,
    /// the edge already exists, or the edge would close a cycle. On success
    /// `dst` and everything downstream of it is marked dirty.
    pub fn connect(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        self.require(src)?;
        self.require(dst)?;

        if self.has_edge(src, dst) {
            log::warn!("Nodes {} and {} are already connected", src, dst);
            return Err(NodeEngineError::DuplicateEdge { from: src, to: dst });
        }
        if src == dst || self.reaches(dst, src) {
            log::warn!("Cycle detected between {} and {}", src, dst);
            return Err(NodeEngineError::CycleRejected { from: src, to: dst });
        }

        if let Some(node) = self.nodes.get_mut(&dst) {
            node.inputs.push(src);
        }
        if let Some(node) = self.nodes.get_mut(&src) {
            node.outputs.push(dst);
        }
        self.propagate_dirty(dst);
        Ok(())
    }

    /// Remove the edge `src -> dst` if present
    ///
    /// Returns whether an edge was removed. A removed edge changes what
    /// `dst` computes, so `dst` and its descendants are marked dirty.
    pub fn disconnect(&mut self, src: NodeId, dst: NodeId) -> bool {
        let removed = match self.nodes.get_mut(&dst) {
            Some(node) => match node.inputs.iter().position(|&id| id == src) {
                Some(pos) => {
                    node.inputs.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        };
        if !removed {
            return false;
        }

        if let Some(node) = self.nodes.get_mut(&src) {
            node.outputs.retain(|&id| id != dst);
        }
        self.propagate_dirty(dst);
        true
    }

    /// Set a parameter value on a node
    ///
    /// Returns `Ok(false)` when the value equals the current one, in which
    /// case nothing is marked dirty. A changed value marks the node and all
    /// of its descendants dirty.
    pub fn set_parameter(&mut self, id: NodeId, name: &str, value: impl Into<ParamValue>) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(NodeEngineError::UnknownNode(id))?;
        let changed = node.parameters.set(name, value.into())?;
        if changed {
            self.propagate_dirty(id);
        }
        Ok(changed)
    }

    /// Explicitly invalidate a node and its descendants
    pub fn mark_dirty(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        self.require(id)?;
        Ok(self.propagate_dirty(id))
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Mark `start` and everything reachable through output edges dirty.
    /// Returns the visited nodes in depth-first order.
    fn propagate_dirty(&mut self, start: NodeId) -> Vec<NodeId> {
        let mut marked = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.mark_dirty();
                marked.push(id);
                stack.extend(node.outputs.iter().rev().copied());
            }
        }
        marked
    }

    /// Whether `to` is reachable from `from` along output edges
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().copied());
            }
        }
        false
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph").field("nodes", &self.nodes).finish()
    }
}
