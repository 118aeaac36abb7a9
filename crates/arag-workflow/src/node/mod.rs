//! Node types for workflow graphs.
//!
//! This module provides the building blocks of a pipeline graph:
//! - [`NodeId`] and [`AgentRef`]: local and backend identifiers
//! - [`NodeType`] and [`NodeCategory`]: what a node is and where it lives
//! - [`Slot`]: where a child node is attached on its parent
//! - [`Node`]: the stored node entity

mod data;
mod id;
mod kind;
mod slot;

pub use data::{NewNode, Node, NodePatch, ParentLink, RetainedAgent};
pub use id::{AgentRef, NodeId};
pub use kind::{INTERNET_PROVIDERS, NodeCategory, NodeType};
pub use slot::Slot;

/// UI or backend configuration object of a node.
pub type Config = serde_json::Map<String, serde_json::Value>;
