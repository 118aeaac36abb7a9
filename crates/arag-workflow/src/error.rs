//! Workflow error types.

use thiserror::Error;

use crate::node::{NodeCategory, NodeId, NodeType, Slot};
use crate::reconcile::StoreError;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Node configuration cannot be encoded or decoded for this type and category.
    #[error("invalid configuration for {node_type} in {category}: {message}")]
    Configuration {
        /// Type of the node being encoded or decoded.
        node_type: NodeType,
        /// Category the node was requested in.
        category: NodeCategory,
        /// Error message.
        message: String,
    },

    /// Node does not exist in the graph.
    #[error("node {node_id} not found in {category}")]
    NodeNotFound {
        /// ID of the missing node.
        node_id: NodeId,
        /// Category that was searched.
        category: NodeCategory,
    },

    /// A singleton slot already holds a child.
    #[error("slot {slot} of node {parent_id} is already occupied")]
    SlotOccupied {
        /// ID of the parent node.
        parent_id: NodeId,
        /// Occupied slot.
        slot: Slot,
    },

    /// A node was placed in a category it does not belong to.
    #[error("{node_type} cannot be placed in {category}: {message}")]
    CategoryMismatch {
        /// Type of the node.
        node_type: NodeType,
        /// Requested category.
        category: NodeCategory,
        /// Error message.
        message: String,
    },

    /// Graph structure would be violated by the operation.
    #[error("invalid graph structure: {0}")]
    InvalidStructure(String),

    /// Remote agent store operation failed.
    #[error("agent store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Creates a configuration error for the given type and category.
    pub fn configuration(
        node_type: NodeType,
        category: NodeCategory,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            node_type,
            category,
            message: message.into(),
        }
    }

    /// Returns `true` if this error was raised by the config codec.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
