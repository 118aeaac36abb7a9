//! Placement of a node being added to the graph.

use crate::node::{NodeId, Slot};

/// Where a new node is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Top-level node of its category, persisted as its own agent.
    Root,
    /// Child embedded in the configuration of `parent_id` at `slot`.
    Child {
        /// Owning node.
        parent_id: NodeId,
        /// Slot on the owning node.
        slot: Slot,
    },
}

impl Origin {
    /// Creates a child origin.
    pub fn child(parent_id: NodeId, slot: Slot) -> Self {
        Self::Child { parent_id, slot }
    }
}
