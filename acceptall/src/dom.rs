//! Immutable DOM snapshots.
//!
//! A snapshot is a flat arena of nodes with parent/child links, serializable
//! so the remote engine can ship page subtrees over the bridge. The identity
//! heuristics and the mock engine both operate on this representation, which
//! keeps them testable without a live page.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a node within its snapshot.
pub type NodeId = usize;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub tag: String,
    /// Text owned directly by this node, not including descendants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub disabled: bool,
}

impl NodeData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A frozen view of (part of) a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomSnapshot {
    nodes: Vec<NodeData>,
}

impl DomSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from nodes whose parent/child links are already
    /// wired, e.g. a subtree serialized by the in-page helper.
    pub fn from_nodes(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }

    /// Append a node under `parent` (or as a root when `None`), wiring both
    /// link directions, and return its id.
    pub fn add_node(&mut self, parent: Option<NodeId>, mut data: NodeData) -> NodeId {
        let id = self.nodes.len();
        data.parent = parent;
        data.children.clear();
        self.nodes.push(data);
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Pre-order ids of the subtree rooted at `id`, including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            // Reverse so pre-order visits children left to right.
            for &child in self.children(cur).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.node(id).and_then(|n| n.attributes.get(name).cloned())
    }

    /// Visible text of the subtree: own and descendant text pieces, trimmed
    /// and joined with single spaces.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut pieces = Vec::new();
        for node_id in self.descendants(id) {
            if let Some(text) = self.node(node_id).and_then(|n| n.text.as_deref()) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed);
                }
            }
        }
        pieces.join(" ")
    }
}
