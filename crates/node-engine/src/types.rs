//! Core identifier and category types shared across the engine

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique identifier for a node instance
///
/// Serialized as its hyphenated string form so documents stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Mint a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Old document id -> freshly minted node id
pub type IdRemap = HashMap<String, NodeId>;

/// Category of a node, used to group the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Graph entry and exit points
    InputOutput,
    /// Color space and tone adjustments
    Color,
    /// Detail and contrast enhancement
    Enhance,
    /// Smoothing filters
    BlurDenoise,
    /// Binarization and edge extraction
    EdgesThreshold,
    /// Geometric changes
    Transform,
    /// Nodes combining several inputs
    Composite,
    /// Model-backed nodes
    MachineLearning,
    /// Anything that did not declare a category
    Uncategorized,
}

impl NodeCategory {
    /// Palette order
    pub const ALL: [NodeCategory; 9] = [
        NodeCategory::InputOutput,
        NodeCategory::Color,
        NodeCategory::Enhance,
        NodeCategory::BlurDenoise,
        NodeCategory::EdgesThreshold,
        NodeCategory::Transform,
        NodeCategory::Composite,
        NodeCategory::MachineLearning,
        NodeCategory::Uncategorized,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::InputOutput => "Input/Output",
            Self::Color => "Color",
            Self::Enhance => "Enhance",
            Self::BlurDenoise => "Blur & Denoise",
            Self::EdgesThreshold => "Edges & Threshold",
            Self::Transform => "Transform",
            Self::Composite => "Composite",
            Self::MachineLearning => "AI / Machine Learning",
            Self::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
