//! Serializable view of the graph.

use serde::{Deserialize, Serialize};

use crate::node::{AgentRef, Node, NodeCategory, NodeId};

/// Backend agent queued for removal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingDeletion {
    /// Identifier of the agent to delete.
    pub agent_ref: AgentRef,
    /// Category the agent lives in.
    pub category: NodeCategory,
}

impl PendingDeletion {
    /// Creates a new pending deletion.
    pub fn new(agent_ref: AgentRef, category: NodeCategory) -> Self {
        Self {
            agent_ref,
            category,
        }
    }
}

/// Point-in-time copy of the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// Preprocess roots in order.
    pub preprocess: Vec<Node>,
    /// Context roots in order.
    pub context: Vec<Node>,
    /// Generation roots in order.
    pub generation: Vec<Node>,
    /// Postprocess roots in order.
    pub postprocess: Vec<Node>,
    /// Every child node, in insertion order.
    pub children: Vec<Node>,
    /// Backend agents awaiting deletion.
    pub pending_deletions: Vec<PendingDeletion>,
    /// Currently selected node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<NodeId>,
    /// Whether the initial load completed.
    pub ready: bool,
    /// Graph revision the snapshot was taken at.
    pub revision: u64,
}

impl WorkflowSnapshot {
    /// Returns the roots of a category.
    pub fn roots(&self, category: NodeCategory) -> &[Node] {
        match category {
            NodeCategory::Preprocess => &self.preprocess,
            NodeCategory::Context => &self.context,
            NodeCategory::Generation => &self.generation,
            NodeCategory::Postprocess => &self.postprocess,
        }
    }

    pub(crate) fn roots_mut(&mut self, category: NodeCategory) -> &mut Vec<Node> {
        match category {
            NodeCategory::Preprocess => &mut self.preprocess,
            NodeCategory::Context => &mut self.context,
            NodeCategory::Generation => &mut self.generation,
            NodeCategory::Postprocess => &mut self.postprocess,
        }
    }

    /// Returns the total number of nodes.
    pub fn node_count(&self) -> usize {
        NodeCategory::ALL
            .iter()
            .map(|category| self.roots(*category).len())
            .sum::<usize>()
            + self.children.len()
    }
}
