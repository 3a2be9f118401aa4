//! Ordered node collections

use super::document::NodeId;

/// An ordered set of nodes, remembering the selector that produced it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    nodes: Vec<NodeId>,
    selector: Option<String>,
}

impl Selection {
    /// Create a selection from nodes, without a selector
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            selector: None,
        }
    }

    /// Create a selection from nodes produced by `selector`
    pub fn with_selector(nodes: Vec<NodeId>, selector: impl Into<String>) -> Self {
        Self {
            nodes,
            selector: Some(selector.into()),
        }
    }

    /// The selector string this selection was created from, if any
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The first node, if any
    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// A selection reduced to its first node, keeping the selector
    pub fn first(&self) -> Selection {
        Self {
            nodes: self.nodes.iter().take(1).copied().collect(),
            selector: self.selector.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

impl From<NodeId> for Selection {
    fn from(id: NodeId) -> Self {
        Self::new(vec![id])
    }
}
