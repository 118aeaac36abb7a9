//! Stored node entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AgentRef, Config, NodeCategory, NodeId, NodeType, Slot};

/// Link from a child node to the node owning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Owning node.
    pub parent_id: NodeId,
    /// Slot the child occupies on the owner.
    pub slot: Slot,
    /// Position within an ordered slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_index: Option<usize>,
}

/// A node of the pipeline graph.
///
/// Parent and child relations are stored as ids on both sides and resolved
/// through the owning [`GraphStore`](crate::graph::GraphStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// Stage kind.
    pub node_type: NodeType,
    /// Pipeline stage the node lives in.
    pub category: NodeCategory,
    /// UI-shaped configuration, absent until the form has been submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    /// Backend identifier once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_ref: Option<AgentRef>,
    /// Whether `config` matches what the backend holds.
    pub is_saved: bool,
    /// Owner link, set on child nodes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    /// Children attached to each slot, in index order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<Slot, Vec<NodeId>>,
    /// Whether the children embedded in `config` must be rebuilt.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub slots_dirty: bool,
    /// Embedded entries loaded from the backend that no child node mirrors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retained: Vec<RetainedAgent>,
    /// Local modification counter.
    #[serde(default)]
    pub revision: u64,
}

impl Node {
    pub(crate) fn new(node_type: NodeType, category: NodeCategory, init: NewNode) -> Self {
        Self {
            id: NodeId::new(),
            node_type,
            category,
            config: init.config,
            agent_ref: init.agent_ref,
            is_saved: init.is_saved,
            parent: None,
            slots: BTreeMap::new(),
            slots_dirty: false,
            retained: Vec::new(),
            revision: 0,
        }
    }

    /// Returns `true` for nodes attached to a parent.
    #[inline]
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    /// Returns the owning node, if any.
    #[inline]
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent.as_ref().map(|link| link.parent_id)
    }

    /// Returns the children attached to `slot`.
    pub fn children_in(&self, slot: &Slot) -> &[NodeId] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates every attached child in slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.values().flatten().copied()
    }

    /// Records a local modification.
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// Iterates the retained entries of `slot` in position order.
    pub fn retained_in<'a>(&'a self, slot: &'a Slot) -> impl Iterator<Item = &'a RetainedAgent> + 'a {
        self.retained.iter().filter(move |entry| entry.slot == *slot)
    }

    /// Returns `true` if the configuration carries at least one `then` entry.
    pub fn has_then_entries(&self) -> bool {
        self.config
            .as_ref()
            .and_then(|config| config.get(Slot::Then.config_key()))
            .and_then(|value| value.as_array())
            .is_some_and(|entries| !entries.is_empty())
    }
}

/// Embedded entry kept verbatim so that rebuilding the parent does not drop it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedAgent {
    /// Slot the entry was found in.
    pub slot: Slot,
    /// Position among the slot's entries.
    pub position: usize,
    /// Entry as the backend returned it.
    pub agent: Value,
}

impl RetainedAgent {
    /// Creates a retained entry.
    pub fn new(slot: Slot, position: usize, agent: Value) -> Self {
        Self { slot, position, agent }
    }
}

/// Initial state of a node being added to the graph.
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    /// Initial configuration.
    pub config: Option<Config>,
    /// Backend identifier, when the node mirrors an existing agent.
    pub agent_ref: Option<AgentRef>,
    /// Whether the configuration is already persisted.
    pub is_saved: bool,
    /// Requested position within an ordered slot.
    pub child_index: Option<usize>,
}

impl NewNode {
    /// Creates an initial state with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    /// Marks the node as mirroring a persisted agent.
    pub fn persisted(mut self, agent_ref: Option<AgentRef>) -> Self {
        self.agent_ref = agent_ref;
        self.is_saved = true;
        self
    }

    /// Sets the requested position within an ordered slot.
    pub fn at_index(mut self, child_index: usize) -> Self {
        self.child_index = Some(child_index);
        self
    }
}

/// Partial update applied by [`GraphStore::update_node`](crate::graph::GraphStore::update_node).
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    /// Replacement configuration.
    pub config: Option<Config>,
    /// Backend identifier to record.
    pub agent_ref: Option<AgentRef>,
    /// Saved flag; omitted means `false`.
    pub is_saved: Option<bool>,
}

impl NodePatch {
    /// Replaces the configuration.
    pub fn config(config: Config) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    /// Marks the node as persisted.
    pub fn saved() -> Self {
        Self {
            is_saved: Some(true),
            ..Default::default()
        }
    }

    /// Records the backend identifier.
    pub fn with_agent_ref(mut self, agent_ref: AgentRef) -> Self {
        self.agent_ref = Some(agent_ref);
        self
    }
}
