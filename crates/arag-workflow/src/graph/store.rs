//! Arena-backed pipeline graph.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::{Origin, PendingDeletion, TRACING_TARGET, WorkflowSnapshot};
use crate::codec::ID_KEY;
use crate::error::{WorkflowError, WorkflowResult};
use crate::node::{
    AgentRef, Config, NewNode, Node, NodeCategory, NodeId, NodePatch, NodeType, ParentLink, RetainedAgent, Slot,
};

/// Result of recording a save against the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Persisted {
    /// The node was deleted while the request was in flight.
    Missing,
    /// The node is now marked saved.
    Saved,
    /// The node changed after the request was built and stays unsaved.
    Modified,
}

/// In-memory pipeline graph.
///
/// Nodes live in a single arena. Roots are ordered per category, children
/// are kept in a pool in insertion order and reachable from their parent's
/// slots. Every mutation bumps [`revision`](Self::revision).
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    roots: [Vec<NodeId>; 4],
    children: Vec<NodeId>,
    selected: Option<NodeId>,
    pending_deletions: Vec<PendingDeletion>,
    ready: bool,
    revision: u64,
}

fn lookup(nodes: &HashMap<NodeId, Node>, id: NodeId, category: NodeCategory) -> WorkflowResult<&Node> {
    match nodes.get(&id) {
        Some(node) if node.category == category => Ok(node),
        Some(node) => Err(WorkflowError::CategoryMismatch {
            node_type: node.node_type,
            category,
            message: format!("node {id} lives in {}", node.category),
        }),
        None => Err(WorkflowError::NodeNotFound {
            node_id: id,
            category,
        }),
    }
}

fn lookup_mut(
    nodes: &mut HashMap<NodeId, Node>,
    id: NodeId,
    category: NodeCategory,
) -> WorkflowResult<&mut Node> {
    match nodes.get_mut(&id) {
        Some(node) if node.category == category => Ok(node),
        Some(node) => Err(WorkflowError::CategoryMismatch {
            node_type: node.node_type,
            category,
            message: format!("node {id} lives in {}", node.category),
        }),
        None => Err(WorkflowError::NodeNotFound {
            node_id: id,
            category,
        }),
    }
}

impl GraphStore {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the graph-wide modification counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// Returns whether the initial load completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Opens the ready gate; reconciliation does nothing before this.
    pub fn mark_ready(&mut self) {
        if !self.ready {
            self.ready = true;
            self.bump();
        }
    }

    /// Removes every node, the selection, the deletion queue and the ready flag.
    pub fn reset(&mut self) {
        let revision = self.revision;
        *self = Self::default();
        self.revision = revision + 1;
        tracing::debug!(target: TRACING_TARGET, revision = self.revision, "Graph reset");
    }

    /// Adds a node and returns a copy of it.
    ///
    /// Children of ordered slots are inserted at the requested index, clamped
    /// to the current length, or appended. Singleton slots accept one child.
    pub fn add_node(
        &mut self,
        origin: Origin,
        node_type: NodeType,
        category: NodeCategory,
        init: NewNode,
    ) -> WorkflowResult<Node> {
        if node_type.category() != category {
            return Err(WorkflowError::CategoryMismatch {
                node_type,
                category,
                message: format!("{node_type} belongs to {}", node_type.category()),
            });
        }

        let requested_index = init.child_index;
        let mut node = Node::new(node_type, category, init);
        let id = node.id;

        let attached = match origin {
            Origin::Root => {
                self.roots[category.index()].push(id);
                None
            }
            Origin::Child { parent_id, slot } => {
                let parent = lookup_mut(&mut self.nodes, parent_id, category)?;
                let child_index = if slot.is_ordered() {
                    let siblings = parent.slots.entry(slot.clone()).or_default();
                    let index = requested_index.unwrap_or(siblings.len()).min(siblings.len());
                    siblings.insert(index, id);
                    Some(index)
                } else if parent.children_in(&slot).is_empty() {
                    parent.slots.insert(slot.clone(), vec![id]);
                    None
                } else {
                    return Err(WorkflowError::SlotOccupied { parent_id, slot });
                };

                node.parent = Some(ParentLink {
                    parent_id,
                    slot: slot.clone(),
                    child_index,
                });
                self.children.push(id);
                Some((parent_id, slot))
            }
        };

        let added = node.clone();
        self.nodes.insert(id, node);
        if let Some((parent_id, slot)) = attached {
            self.reindex(parent_id, &slot);
        }
        self.bump();

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %id,
            node_type = %node_type,
            category = %category,
            parent_id = ?added.parent_id(),
            "Node added"
        );
        Ok(added)
    }

    /// Applies a partial update and returns a copy of the node.
    ///
    /// A new configuration replaces the old one. The saved flag is reset
    /// unless the patch sets it explicitly.
    pub fn update_node(&mut self, id: NodeId, category: NodeCategory, patch: NodePatch) -> WorkflowResult<Node> {
        let node = lookup_mut(&mut self.nodes, id, category)?;
        if let Some(config) = patch.config {
            node.config = Some(config);
            node.slots_dirty |= !node.slots.is_empty();
        }
        if let Some(agent_ref) = patch.agent_ref {
            node.agent_ref = Some(agent_ref);
        }
        node.is_saved = patch.is_saved.unwrap_or(false);
        node.touch();

        let updated = node.clone();
        self.bump();
        Ok(updated)
    }

    /// Removes a node with its whole subtree and returns the removed nodes,
    /// target first.
    ///
    /// A persisted root is queued for remote deletion. A child is detached
    /// from its parent, whose configuration no longer embeds it.
    pub fn delete_node(
        &mut self,
        id: NodeId,
        category: NodeCategory,
        parent_id: Option<NodeId>,
    ) -> WorkflowResult<Vec<Node>> {
        let target = lookup(&self.nodes, id, category)?;
        let link = target.parent.clone();
        let agent_ref = target.agent_ref.clone();

        match (&link, parent_id) {
            (Some(link), Some(expected)) if link.parent_id != expected => {
                return Err(WorkflowError::InvalidStructure(format!(
                    "node {id} is a child of {}, not {expected}",
                    link.parent_id
                )));
            }
            (None, Some(expected)) => {
                return Err(WorkflowError::InvalidStructure(format!(
                    "node {id} is a root, not a child of {expected}"
                )));
            }
            _ => {}
        }

        match &link {
            Some(link) => self.detach(id, link, agent_ref.as_ref()),
            None => self.roots[category.index()].retain(|root| *root != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.remove(&next) else {
                continue;
            };
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().rev());
            removed.push(node);
        }

        let removed_ids: HashSet<NodeId> = removed.iter().map(|node| node.id).collect();
        self.children.retain(|child| !removed_ids.contains(child));
        if self.selected.is_some_and(|selected| removed_ids.contains(&selected)) {
            self.selected = None;
        }
        if link.is_none()
            && let Some(agent_ref) = agent_ref
        {
            self.enqueue_deletion(PendingDeletion::new(agent_ref, category));
        }
        self.bump();

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %id,
            category = %category,
            removed = removed.len(),
            "Node deleted"
        );
        Ok(removed)
    }

    fn detach(&mut self, child_id: NodeId, link: &ParentLink, child_ref: Option<&AgentRef>) {
        let Some(parent) = self.nodes.get_mut(&link.parent_id) else {
            return;
        };
        let key = link.slot.config_key();

        if link.slot.is_ordered() {
            if let Some(siblings) = parent.slots.get_mut(&link.slot) {
                siblings.retain(|sibling| *sibling != child_id);
            }
            if let Some(child_ref) = child_ref
                && let Some(Value::Array(entries)) = parent.config.as_mut().and_then(|config| config.get_mut(key))
            {
                entries.retain(|entry| entry.get(ID_KEY).and_then(Value::as_str) != Some(child_ref.as_str()));
            }
            parent.slots_dirty = true;
        } else {
            parent.slots.remove(&link.slot);
            if let Some(config) = parent.config.as_mut()
                && config.contains_key(key)
            {
                config.insert(key.to_owned(), Value::Null);
            }
        }

        parent.is_saved = false;
        parent.touch();
        self.reindex(link.parent_id, &link.slot);
    }

    fn reindex(&mut self, parent_id: NodeId, slot: &Slot) {
        if !slot.is_ordered() {
            return;
        }
        let Some(siblings) = self.nodes.get(&parent_id).map(|parent| parent.children_in(slot).to_vec()) else {
            return;
        };
        for (index, sibling) in siblings.into_iter().enumerate() {
            if let Some(link) = self.nodes.get_mut(&sibling).and_then(|node| node.parent.as_mut()) {
                link.child_index = Some(index);
            }
        }
    }

    /// Returns a node of the given category.
    pub fn get_node(&self, id: NodeId, category: NodeCategory) -> Option<&Node> {
        self.nodes.get(&id).filter(|node| node.category == category)
    }

    /// Returns a node regardless of its category.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns the node mirroring a backend agent.
    pub fn get_node_by_agent_ref(&self, agent_ref: &AgentRef, category: NodeCategory) -> Option<&Node> {
        self.roots[category.index()]
            .iter()
            .chain(&self.children)
            .filter_map(|id| self.nodes.get(id))
            .find(|node| node.category == category && node.agent_ref.as_ref() == Some(agent_ref))
    }

    /// Iterates the roots of a category in order.
    pub fn roots(&self, category: NodeCategory) -> impl Iterator<Item = &Node> + '_ {
        self.roots[category.index()].iter().filter_map(|id| self.nodes.get(id))
    }

    /// Returns every root in category order, followed by the children when requested.
    pub fn all_nodes(&self, include_children: bool) -> Vec<&Node> {
        let roots = NodeCategory::ALL.iter().flat_map(|category| self.roots(*category));
        if include_children {
            roots
                .chain(self.children.iter().filter_map(|id| self.nodes.get(id)))
                .collect()
        } else {
            roots.collect()
        }
    }

    /// Selects a node.
    pub fn select_node(&mut self, id: NodeId, category: NodeCategory) -> WorkflowResult<()> {
        lookup(&self.nodes, id, category)?;
        if self.selected != Some(id) {
            self.selected = Some(id);
            self.bump();
        }
        Ok(())
    }

    /// Clears the selection.
    pub fn unselect_node(&mut self) {
        if self.selected.take().is_some() {
            self.bump();
        }
    }

    /// Returns the selected node.
    pub fn selected(&self) -> Option<&Node> {
        self.selected.and_then(|id| self.nodes.get(&id))
    }

    /// Returns whether a node has a child attached to its `then` branch.
    pub fn has_child_in_then(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|node| !node.children_in(&Slot::Then).is_empty())
    }

    /// Returns whether a node can be persisted.
    ///
    /// The configuration must be present, and conditional nodes need at least
    /// one embedded `then` agent.
    pub fn is_fully_configured(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|node| {
            node.config.is_some() && (!node.node_type.is_conditional() || node.has_then_entries())
        })
    }

    /// Returns the backend agents awaiting deletion.
    pub fn pending_deletions(&self) -> &[PendingDeletion] {
        &self.pending_deletions
    }

    /// Queues a backend agent for deletion; duplicates are ignored.
    pub fn enqueue_deletion(&mut self, deletion: PendingDeletion) {
        if !self.pending_deletions.contains(&deletion) {
            tracing::debug!(
                target: TRACING_TARGET,
                agent_ref = %deletion.agent_ref,
                category = %deletion.category,
                "Agent queued for deletion"
            );
            self.pending_deletions.push(deletion);
            self.bump();
        }
    }

    /// Drops queued deletions for which `keep` returns `false`.
    pub fn retain_pending(&mut self, mut keep: impl FnMut(&PendingDeletion) -> bool) {
        let before = self.pending_deletions.len();
        self.pending_deletions.retain(|deletion| keep(deletion));
        if self.pending_deletions.len() != before {
            self.bump();
        }
    }

    /// Returns the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.nodes.get(&id).and_then(Node::parent_id);
        while let Some(parent_id) = current {
            if ancestors.contains(&parent_id) {
                break;
            }
            ancestors.push(parent_id);
            current = self.nodes.get(&parent_id).and_then(Node::parent_id);
        }
        ancestors
    }

    /// Returns every descendant of a node in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut descendants = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(node) => node.children().collect(),
            None => return descendants,
        };
        stack.reverse();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                descendants.push(next);
                let children: Vec<NodeId> = node.children().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        descendants
    }

    /// Iterates every child node in insertion order.
    pub(crate) fn child_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.children.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Keeps an embedded entry of `parent_id` that could not be loaded as a node.
    pub(crate) fn retain_agent(&mut self, parent_id: NodeId, entry: RetainedAgent) {
        if let Some(node) = self.nodes.get_mut(&parent_id) {
            tracing::debug!(
                target: TRACING_TARGET,
                parent_id = %parent_id,
                slot = %entry.slot,
                position = entry.position,
                "Retaining embedded entry"
            );
            node.retained.push(entry);
        }
    }

    /// Replaces a node's configuration with a rebuilt one carrying its children.
    ///
    /// A rebuild identical to the stored configuration only clears the dirty
    /// flag. Returns `true` when the configuration changed.
    pub(crate) fn apply_embedding(&mut self, id: NodeId, config: Config) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.slots_dirty = false;
        if node.config.as_ref() == Some(&config) {
            return false;
        }
        node.config = Some(config);
        node.is_saved = false;
        node.touch();
        self.bump();
        true
    }

    /// Records a successful save of `id` taken at `revision`.
    ///
    /// The agent reference is always recorded; the node is only marked saved
    /// when it was not modified since.
    pub(crate) fn mark_persisted(&mut self, id: NodeId, agent_ref: Option<AgentRef>, revision: u64) -> Persisted {
        let Some(node) = self.nodes.get_mut(&id) else {
            return Persisted::Missing;
        };
        let mut changed = false;
        if let Some(agent_ref) = agent_ref
            && node.agent_ref.as_ref() != Some(&agent_ref)
        {
            node.agent_ref = Some(agent_ref);
            changed = true;
        }
        let outcome = if node.revision != revision {
            Persisted::Modified
        } else {
            changed |= !node.is_saved;
            node.is_saved = true;
            Persisted::Saved
        };
        if changed {
            self.bump();
        }
        outcome
    }

    /// Returns a serializable copy of the graph.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let mut snapshot = WorkflowSnapshot {
            children: self.child_nodes().cloned().collect(),
            pending_deletions: self.pending_deletions.clone(),
            selected: self.selected,
            ready: self.ready,
            revision: self.revision,
            ..Default::default()
        };
        for category in NodeCategory::ALL {
            *snapshot.roots_mut(category) = self.roots(category).cloned().collect();
        }
        snapshot
    }

    /// Verifies the structural invariants of the graph.
    pub fn check_invariants(&self) -> WorkflowResult<()> {
        let fail = |message: String| Err(WorkflowError::InvalidStructure(message));

        let mut seen = HashSet::new();
        for category in NodeCategory::ALL {
            for id in &self.roots[category.index()] {
                let Some(node) = self.nodes.get(id) else {
                    return fail(format!("root {id} is not stored"));
                };
                if node.category != category || node.is_child() {
                    return fail(format!("root {id} is misplaced"));
                }
                if !seen.insert(*id) {
                    return fail(format!("node {id} appears twice"));
                }
            }
        }
        for id in &self.children {
            let Some(node) = self.nodes.get(id) else {
                return fail(format!("child {id} is not stored"));
            };
            if !node.is_child() {
                return fail(format!("child {id} has no parent"));
            }
            if !seen.insert(*id) {
                return fail(format!("node {id} appears twice"));
            }
        }
        if seen.len() != self.nodes.len() {
            return fail("stored nodes are unreachable from roots or children".to_owned());
        }

        let mut referenced = HashSet::new();
        for node in self.nodes.values() {
            if let Some(link) = &node.parent {
                let Some(parent) = self.nodes.get(&link.parent_id) else {
                    return fail(format!("parent of {} is missing", node.id));
                };
                if parent.category != node.category {
                    return fail(format!("{} and its parent live in different categories", node.id));
                }
                let siblings = parent.children_in(&link.slot);
                let position = siblings.iter().position(|sibling| *sibling == node.id);
                match (position, link.child_index) {
                    (Some(position), Some(index)) if position == index && link.slot.is_ordered() => {}
                    (Some(_), None) if !link.slot.is_ordered() => {}
                    _ => return fail(format!("{} is not at its recorded slot position", node.id)),
                }
            }
            for (slot, children) in &node.slots {
                if !slot.is_ordered() && children.len() > 1 {
                    return fail(format!("slot {slot} of {} holds several children", node.id));
                }
                for child in children {
                    if !referenced.insert(*child) {
                        return fail(format!("child {child} is attached twice"));
                    }
                    if self.nodes.get(child).and_then(Node::parent_id) != Some(node.id) {
                        return fail(format!("child {child} does not point back to {}", node.id));
                    }
                }
            }
        }
        if self.selected.is_some_and(|id| !self.nodes.contains_key(&id)) {
            return fail("selection points to a missing node".to_owned());
        }
        Ok(())
    }
}
