use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A link endpoint as written in the input: either a position in the node
/// list or a node name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Index(idx) => write!(f, "#{idx}"),
            NodeRef::Name(name) => write!(f, "{name:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    /// Column key this node belongs to. Takes precedence over name matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            label: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub source: NodeRef,
    pub target: NodeRef,
    pub value: f64,
}

impl LinkSpec {
    pub fn new(source: usize, target: usize, value: f64) -> Self {
        Self {
            source: NodeRef::Index(source),
            target: NodeRef::Index(target),
            value,
        }
    }

    pub fn named(source: impl Into<String>, target: impl Into<String>, value: f64) -> Self {
        Self {
            source: NodeRef::Name(source.into()),
            target: NodeRef::Name(target.into()),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name to position. The first node wins when names repeat.
    pub fn name_index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            index.entry(node.name.as_str()).or_insert(idx);
        }
        index
    }
}
