//! Node type registry
//!
//! Maps stable type names to metadata and a factory producing the node's
//! [`ProcessingNode`]. Registries are built once at startup through a
//! [`RegistryBuilder`] and then shared immutably (`Arc<NodeRegistry>`) by
//! every graph, session and batch runner that needs to construct nodes.
//!
//! # Usage
//!
//! ```ignore
//! use node_engine::NodeRegistry;
//!
//! let mut builder = NodeRegistry::builder();
//! builder.register::<InvertNode>();
//! workflow_nodes::register_builtins(&mut builder, codec);
//! let registry = Arc::new(builder.build());
//!
//! let node = registry.construct("Invert")?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::descriptor::{NodeDescriptor, NodeMetadata, ProcessingNode};
use crate::error::{NodeEngineError, Result};
use crate::parameter::Parameters;
use crate::types::NodeCategory;

/// Factory for creating or returning a shared ProcessingNode
pub trait NodeFactory: Send + Sync {
    fn create(&self) -> Arc<dyn ProcessingNode>;
}

/// Factory that returns a shared node instance
struct SharedNodeFactory {
    node: Arc<dyn ProcessingNode>,
}

impl NodeFactory for SharedNodeFactory {
    fn create(&self) -> Arc<dyn ProcessingNode> {
        self.node.clone()
    }
}

/// Factory that builds a new node per instance
struct FnNodeFactory<F> {
    make: F,
}

impl<F> NodeFactory for FnNodeFactory<F>
where
    F: Fn() -> Arc<dyn ProcessingNode> + Send + Sync,
{
    fn create(&self) -> Arc<dyn ProcessingNode> {
        (self.make)()
    }
}

/// A registration entry combining metadata with its factory
struct RegistryEntry {
    metadata: Arc<NodeMetadata>,
    factory: Arc<dyn NodeFactory>,
}

/// A freshly constructed node with default parameters
pub struct ConstructedNode {
    pub metadata: Arc<NodeMetadata>,
    pub processor: Arc<dyn ProcessingNode>,
    pub parameters: Parameters,
}

/// Collects registrations before freezing them into a [`NodeRegistry`]
///
/// Registering a type name twice overwrites the earlier entry.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type with metadata and a factory
    pub fn register_factory(
        &mut self,
        metadata: NodeMetadata,
        factory: Arc<dyn NodeFactory>,
    ) -> &mut Self {
        if self.entries.contains_key(&metadata.node_type) {
            log::debug!("Overwriting node type registration '{}'", metadata.node_type);
        }
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata: Arc::new(metadata),
                factory,
            },
        );
        self
    }

    /// Register a node type whose processor is shared by all instances
    pub fn register_shared(
        &mut self,
        metadata: NodeMetadata,
        node: Arc<dyn ProcessingNode>,
    ) -> &mut Self {
        self.register_factory(metadata, Arc::new(SharedNodeFactory { node }))
    }

    /// Register a node type built fresh for every instance
    ///
    /// Use this for nodes that hold per-instance state, such as a lazily
    /// loaded model.
    pub fn register_fn<F>(&mut self, metadata: NodeMetadata, make: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn ProcessingNode> + Send + Sync + 'static,
    {
        self.register_factory(metadata, Arc::new(FnNodeFactory { make }))
    }

    /// Register a self-describing, default-constructible node type
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: NodeDescriptor + ProcessingNode + Default + 'static,
    {
        self.register_fn(T::descriptor(), || Arc::new(T::default()) as Arc<dyn ProcessingNode>)
    }

    pub fn build(self) -> NodeRegistry {
        log::debug!("Node registry built with {} types", self.entries.len());
        NodeRegistry {
            entries: self.entries,
        }
    }
}

/// Registry of node types with their metadata and factories
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// An empty registry
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Construct a new instance of a node type with default parameters
    pub fn construct(&self, node_type: &str) -> Result<ConstructedNode> {
        let entry = self
            .entries
            .get(node_type)
            .ok_or_else(|| NodeEngineError::UnknownNodeType(node_type.to_string()))?;
        Ok(ConstructedNode {
            metadata: entry.metadata.clone(),
            processor: entry.factory.create(),
            parameters: entry.metadata.parameters.clone(),
        })
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.entries.get(node_type).map(|e| e.metadata.as_ref())
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered type names, sorted
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Type names grouped by category, in palette order, sorted by name
    /// within each category. Empty categories are omitted.
    pub fn list_by_category(&self) -> BTreeMap<NodeCategory, Vec<String>> {
        let mut grouped: BTreeMap<NodeCategory, Vec<String>> = BTreeMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(entry.metadata.node_type.clone());
        }
        for names in grouped.values_mut() {
            names.sort();
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
