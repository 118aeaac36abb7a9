//! Reconciliation planning.
//!
//! A plan is computed under a single write lock so embedding, save requests
//! and deletions all derive from one consistent view of the graph.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde_json::Value;

use super::{Notification, TRACING_TARGET};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::{GraphStore, PendingDeletion};
use crate::node::{AgentRef, Config, NodeCategory, NodeId, NodeType, Slot};
use crate::registry::NodeRegistry;

/// Remote operation a root needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SaveKind {
    Add,
    Update(AgentRef),
}

/// Save of one root with everything embedded in it.
#[derive(Debug, Clone)]
pub(crate) struct SaveRequest {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub category: NodeCategory,
    pub kind: SaveKind,
    pub payload: Config,
    /// Root revision the payload was built from.
    pub revision: u64,
    /// Embedded descendants and their revisions at plan time.
    pub embedded: Vec<(NodeId, u64)>,
}

/// Work computed for one reconciliation pass.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub saves: Vec<SaveRequest>,
    pub deletions: Vec<PendingDeletion>,
    pub failures: Vec<Notification>,
    pub skipped_in_flight: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.saves.is_empty() && self.deletions.is_empty() && self.failures.is_empty()
    }
}

/// Computes the work of a pass, embedding modified children into their
/// ancestors on the way.
pub(crate) fn plan(
    graph: &mut GraphStore,
    registry: &NodeRegistry,
    in_flight: &HashSet<NodeId>,
    deletes_in_flight: bool,
) -> Plan {
    let mut plan = Plan::default();
    embed_children(graph, registry, in_flight, &mut plan);
    plan_saves(graph, registry, in_flight, &mut plan);
    if !deletes_in_flight {
        plan.deletions = plan_deletions(graph);
    } else if !graph.pending_deletions().is_empty() {
        plan.skipped_in_flight += 1;
    }
    plan
}

fn embed_children(graph: &mut GraphStore, registry: &NodeRegistry, in_flight: &HashSet<NodeId>, plan: &mut Plan) {
    let sources: Vec<(NodeId, bool)> = graph
        .all_nodes(true)
        .into_iter()
        .filter_map(|node| {
            if node.is_child() && node.config.is_some() && !node.is_saved {
                Some((node.id, false))
            } else if node.slots_dirty {
                Some((node.id, true))
            } else {
                None
            }
        })
        .collect();

    let mut rebuild = HashSet::new();
    for (source, owns_slots) in sources {
        let mut chain = graph.ancestors(source);
        if owns_slots {
            chain.insert(0, source);
        }
        let Some(root) = chain.last().copied() else {
            continue;
        };
        if in_flight.contains(&root) {
            continue;
        }
        let configured = chain
            .iter()
            .all(|id| graph.node(*id).is_some_and(|node| node.config.is_some()));
        if configured {
            rebuild.extend(chain);
        }
    }
    if rebuild.is_empty() {
        return;
    }

    let mut order: Vec<(usize, NodeId)> = rebuild
        .into_iter()
        .map(|id| (graph.ancestors(id).len(), id))
        .collect();
    order.sort_by_key(|(depth, _)| Reverse(*depth));

    let mut blocked = HashSet::new();
    for (_, id) in order {
        if blocked.contains(&id) {
            continue;
        }
        match embedded_config(graph, registry, id) {
            Ok(config) => {
                if !graph.apply_embedding(id, config) {
                    tracing::trace!(target: TRACING_TARGET, node_id = %id, "Embedded children unchanged");
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    node_id = %id,
                    error = %error,
                    "Failed to embed children"
                );
                blocked.extend(graph.ancestors(id));
                plan.failures.push(Notification::error(
                    "Failed to save node",
                    error.to_string(),
                ));
            }
        }
    }
}

/// Rebuilds the slot keys of a node's configuration from its children.
fn embedded_config(graph: &GraphStore, registry: &NodeRegistry, id: NodeId) -> WorkflowResult<Config> {
    let node = graph
        .node(id)
        .ok_or_else(|| WorkflowError::Internal(format!("node {id} vanished while embedding")))?;
    let mut config = node.config.clone().unwrap_or_default();

    for (slot, children) in &node.slots {
        let mut encoded = Vec::with_capacity(children.len());
        for child in children.iter().filter_map(|child| graph.node(*child)) {
            if let Some(child_config) = &child.config {
                let agent = registry.encode(child.node_type, child.category, child_config, child.agent_ref.as_ref())?;
                encoded.push(Value::Object(agent));
            }
        }

        let key = slot.config_key().to_owned();
        if slot.is_ordered() {
            for entry in node.retained_in(slot) {
                let position = entry.position.min(encoded.len());
                encoded.insert(position, entry.agent.clone());
            }
            if *slot == Slot::Else {
                config.remove("else");
            }
            config.insert(key, Value::Array(encoded));
        } else {
            let value = encoded
                .into_iter()
                .next()
                .or_else(|| node.retained_in(slot).next().map(|entry| entry.agent.clone()))
                .unwrap_or(Value::Null);
            config.insert(key, value);
        }
    }
    Ok(config)
}

fn plan_saves(graph: &GraphStore, registry: &NodeRegistry, in_flight: &HashSet<NodeId>, plan: &mut Plan) {
    for category in NodeCategory::ALL {
        for root in graph.roots(category) {
            let Some(config) = &root.config else {
                continue;
            };
            let kind = match &root.agent_ref {
                None => SaveKind::Add,
                Some(agent_ref) if !root.is_saved => SaveKind::Update(agent_ref.clone()),
                Some(_) => continue,
            };
            if !graph.is_fully_configured(root.id) {
                continue;
            }
            if in_flight.contains(&root.id) {
                plan.skipped_in_flight += 1;
                continue;
            }

            let payload = match registry.encode(root.node_type, category, config, None) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        node_id = %root.id,
                        error = %error,
                        "Failed to encode node"
                    );
                    plan.failures.push(Notification::error("Failed to save node", error.to_string()));
                    continue;
                }
            };

            let embedded = graph
                .descendants(root.id)
                .into_iter()
                .filter_map(|id| graph.node(id))
                .filter(|node| node.config.is_some())
                .map(|node| (node.id, node.revision))
                .collect();

            plan.saves.push(SaveRequest {
                node_id: root.id,
                node_type: root.node_type,
                category,
                kind,
                payload,
                revision: root.revision,
                embedded,
            });
        }
    }
}

fn plan_deletions(graph: &mut GraphStore) -> Vec<PendingDeletion> {
    let revived: Vec<PendingDeletion> = graph
        .pending_deletions()
        .iter()
        .filter(|deletion| {
            graph
                .get_node_by_agent_ref(&deletion.agent_ref, deletion.category)
                .is_some()
        })
        .cloned()
        .collect();
    if !revived.is_empty() {
        tracing::debug!(
            target: TRACING_TARGET,
            count = revived.len(),
            "Dropping deletions of agents still held by live nodes"
        );
        graph.retain_pending(|deletion| !revived.contains(deletion));
    }
    graph.pending_deletions().to_vec()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;
    use crate::graph::Origin;
    use crate::node::{NewNode, NodePatch, RetainedAgent};

    fn conditional_with_child(graph: &mut GraphStore) -> (NodeId, NodeId) {
        let root = graph
            .add_node(
                Origin::Root,
                NodeType::PreConditional,
                NodeCategory::Preprocess,
                NewNode::with_config(object(json!({ "prompt": "mentions a date?" }))),
            )
            .unwrap()
            .id;
        let child = graph
            .add_node(
                Origin::child(root, Slot::Then),
                NodeType::Historical,
                NodeCategory::Preprocess,
                NewNode::with_config(object(json!({ "all": true }))),
            )
            .unwrap()
            .id;
        (root, child)
    }

    #[test]
    fn children_are_embedded_before_roots_are_judged() {
        let mut graph = GraphStore::new();
        let (root, child) = conditional_with_child(&mut graph);
        let registry = NodeRegistry::standard();

        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        assert_eq!(plan.saves.len(), 1);
        let save = &plan.saves[0];
        assert_eq!(save.node_id, root);
        assert_eq!(save.kind, SaveKind::Add);
        assert_eq!(save.payload["module"], "pre_conditional");
        assert_eq!(save.payload["then"], json!([{ "module": "historical", "all": true }]));
        assert_eq!(save.embedded, vec![(child, 0)]);
        assert_eq!(save.revision, graph.node(root).unwrap().revision);
    }

    #[test]
    fn unconfigured_parent_blocks_embedding() {
        let mut graph = GraphStore::new();
        let root = graph
            .add_node(Origin::Root, NodeType::PreConditional, NodeCategory::Preprocess, NewNode::default())
            .unwrap()
            .id;
        graph
            .add_node(
                Origin::child(root, Slot::Then),
                NodeType::Historical,
                NodeCategory::Preprocess,
                NewNode::with_config(object(json!({ "all": true }))),
            )
            .unwrap();

        let registry = NodeRegistry::standard();
        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        assert!(plan.is_empty());
        assert!(graph.node(root).unwrap().config.is_none());
    }

    #[test]
    fn in_flight_roots_are_skipped() {
        let mut graph = GraphStore::new();
        let (root, _) = conditional_with_child(&mut graph);
        let registry = NodeRegistry::standard();
        let revision = graph.revision();

        let plan = plan(&mut graph, &registry, &HashSet::from([root]), false);
        assert!(plan.saves.is_empty());
        assert_eq!(graph.revision(), revision);
    }

    #[test]
    fn nested_children_embed_bottom_up() {
        let mut graph = GraphStore::new();
        let root = graph
            .add_node(
                Origin::Root,
                NodeType::ContextConditional,
                NodeCategory::Context,
                NewNode::with_config(object(json!({ "prompt": "outer" }))),
            )
            .unwrap()
            .id;
        let inner = graph
            .add_node(
                Origin::child(root, Slot::Then),
                NodeType::ContextConditional,
                NodeCategory::Context,
                NewNode::with_config(object(json!({ "prompt": "inner" }))),
            )
            .unwrap()
            .id;
        graph
            .add_node(
                Origin::child(inner, Slot::Else),
                NodeType::Sql,
                NodeCategory::Context,
                NewNode::with_config(object(json!({ "source": "db", "prompt": "orders" }))),
            )
            .unwrap();

        let registry = NodeRegistry::standard();
        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        // The outer conditional is complete; the inner one has no `then` agent
        // but is embedded as-is.
        assert_eq!(plan.saves.len(), 1);
        let nested = &plan.saves[0].payload["then"][0];
        assert_eq!(nested["module"], "context_conditional");
        assert_eq!(nested["else_"][0]["module"], "sql");
        assert_eq!(nested["else_"][0]["description"], "orders");
    }

    #[test]
    fn unchanged_embedding_leaves_graph_untouched() {
        let mut graph = GraphStore::new();
        let root = graph
            .add_node(
                Origin::Root,
                NodeType::PreConditional,
                NodeCategory::Preprocess,
                NewNode::with_config(object(json!({ "prompt": "p" }))),
            )
            .unwrap()
            .id;
        graph
            .add_node(
                Origin::child(root, Slot::Else),
                NodeType::Historical,
                NodeCategory::Preprocess,
                NewNode::with_config(object(json!({ "all": true }))),
            )
            .unwrap();
        let registry = NodeRegistry::standard();

        let first = plan(&mut graph, &registry, &HashSet::new(), false);
        assert!(first.saves.is_empty());
        let revision = graph.revision();

        for _ in 0..3 {
            let idle = plan(&mut graph, &registry, &HashSet::new(), false);
            assert!(idle.is_empty());
        }
        assert_eq!(graph.revision(), revision);
    }

    #[test]
    fn retained_entries_keep_their_position() {
        let mut graph = GraphStore::new();
        let root = graph
            .add_node(
                Origin::Root,
                NodeType::ContextConditional,
                NodeCategory::Context,
                NewNode::with_config(object(json!({ "prompt": "p" }))),
            )
            .unwrap()
            .id;
        graph.retain_agent(
            root,
            RetainedAgent::new(Slot::Then, 0, json!({ "id": "f-1", "module": "future_module" })),
        );
        graph
            .add_node(
                Origin::child(root, Slot::Then),
                NodeType::Sql,
                NodeCategory::Context,
                NewNode::with_config(object(json!({ "source": "db", "prompt": "orders" }))),
            )
            .unwrap();

        let registry = NodeRegistry::standard();
        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        let then = plan.saves[0].payload["then"].as_array().unwrap();
        assert_eq!(then.len(), 2);
        assert_eq!(then[0]["module"], "future_module");
        assert_eq!(then[1]["module"], "sql");
    }

    #[test]
    fn revived_deletions_are_dropped() {
        let mut graph = GraphStore::new();
        graph
            .add_node(
                Origin::Root,
                NodeType::Generate,
                NodeCategory::Generation,
                NewNode::with_config(Config::new()).persisted(Some("gen-1".into())),
            )
            .unwrap();
        graph.enqueue_deletion(PendingDeletion::new("gen-1".into(), NodeCategory::Generation));
        graph.enqueue_deletion(PendingDeletion::new("gen-0".into(), NodeCategory::Generation));

        let registry = NodeRegistry::standard();
        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        assert_eq!(
            plan.deletions,
            vec![PendingDeletion::new("gen-0".into(), NodeCategory::Generation)]
        );
        assert_eq!(graph.pending_deletions().len(), 1);
    }

    #[test]
    fn parent_config_replacement_reembeds_children() {
        let mut graph = GraphStore::new();
        let (root, _) = conditional_with_child(&mut graph);
        let registry = NodeRegistry::standard();
        plan(&mut graph, &registry, &HashSet::new(), false);

        graph
            .update_node(
                root,
                NodeCategory::Preprocess,
                NodePatch::config(object(json!({ "prompt": "rephrased" }))),
            )
            .unwrap();
        assert!(!graph.is_fully_configured(root));

        let plan = plan(&mut graph, &registry, &HashSet::new(), false);
        assert_eq!(plan.saves.len(), 1);
        assert_eq!(plan.saves[0].payload["prompt"], "rephrased");
        assert_eq!(plan.saves[0].payload["then"][0]["module"], "historical");
    }
}
