//! Rebuilds a graph from the agents held by the remote store.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use super::{AgentStore, Notification, Notifier, TRACING_TARGET, TracingNotifier};
use crate::codec::{CHILD_KEYS, ID_KEY, MODULE_KEY};
use crate::graph::{GraphStore, Origin, SharedGraph};
use crate::node::{AgentRef, Config, NewNode, NodeCategory, NodeId, NodeType, RetainedAgent, Slot};
use crate::registry::NodeRegistry;

/// Summary of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Root nodes created.
    pub roots: usize,
    /// Child nodes created from embedded agents.
    pub children: usize,
    /// Agents that could not be mapped to a node.
    pub skipped: usize,
    /// Categories whose agents could not be fetched.
    pub failed_categories: Vec<NodeCategory>,
}

/// Loads the remote pipeline into a [`SharedGraph`].
pub struct WorkflowLoader {
    graph: SharedGraph,
    store: Arc<dyn AgentStore>,
    registry: Arc<NodeRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowLoader {
    /// Creates a loader that logs failures through [`TracingNotifier`].
    pub fn new(graph: SharedGraph, store: Arc<dyn AgentStore>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            graph,
            store,
            registry,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replaces the notifier failures are reported to.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the graph with the agents of every category and opens the
    /// ready gate.
    ///
    /// A category that cannot be fetched is reported and loaded as empty.
    pub async fn load(&self) -> LoadReport {
        let fetched = join_all(NodeCategory::ALL.map(|category| async move {
            (category, self.store.list_agents(category).await)
        }))
        .await;

        let mut report = LoadReport::default();
        let mut categories = Vec::with_capacity(fetched.len());
        for (category, result) in fetched {
            match result {
                Ok(agents) => categories.push((category, agents)),
                Err(error) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        category = %category,
                        error = %error,
                        "Failed to fetch agents"
                    );
                    self.notifier.notify(Notification::error(
                        format!("Failed to load {category} agents"),
                        error.to_string(),
                    ));
                    report.failed_categories.push(category);
                    categories.push((category, Vec::new()));
                }
            }
        }

        self.graph
            .update(|graph| {
                graph.reset();
                for (category, agents) in &categories {
                    for agent in agents {
                        self.load_root(graph, *category, agent, &mut report);
                    }
                }
                graph.mark_ready();
            })
            .await;

        tracing::info!(
            target: TRACING_TARGET,
            roots = report.roots,
            children = report.children,
            skipped = report.skipped,
            "Workflow loaded"
        );
        report
    }

    fn load_root(&self, graph: &mut GraphStore, category: NodeCategory, agent: &Config, report: &mut LoadReport) {
        let Some(node_id) = self.load_node(graph, Origin::Root, category, agent, None, report) else {
            return;
        };
        report.roots += 1;
        self.load_children(graph, node_id, category, report);
    }

    fn load_children(&self, graph: &mut GraphStore, parent_id: NodeId, category: NodeCategory, report: &mut LoadReport) {
        let Some(config) = graph.node(parent_id).and_then(|node| node.config.clone()) else {
            return;
        };

        for key in CHILD_KEYS {
            let slot = Slot::from_config_key(key);
            let entries: Vec<&Value> = match config.get(key) {
                Some(value @ Value::Object(_)) => vec![value],
                Some(Value::Array(items)) => items.iter().collect(),
                _ => continue,
            };

            let mut loaded = 0;
            for (position, entry) in entries.into_iter().enumerate() {
                let child_id = entry.as_object().filter(|agent| is_agent(agent)).and_then(|agent| {
                    let child_index = slot.is_ordered().then_some(loaded);
                    let origin = Origin::child(parent_id, slot.clone());
                    self.load_node(graph, origin, category, agent, child_index, report)
                });

                match child_id {
                    Some(child_id) => {
                        loaded += 1;
                        report.children += 1;
                        self.load_children(graph, child_id, category, report);
                    }
                    None => graph.retain_agent(parent_id, RetainedAgent::new(slot.clone(), position, entry.clone())),
                }
            }
        }
    }

    fn load_node(
        &self,
        graph: &mut GraphStore,
        origin: Origin,
        category: NodeCategory,
        agent: &Config,
        child_index: Option<usize>,
        report: &mut LoadReport,
    ) -> Option<NodeId> {
        let module = agent.get(MODULE_KEY).and_then(Value::as_str).unwrap_or_default();
        let Some(node_type) = NodeType::from_module(module) else {
            tracing::warn!(target: TRACING_TARGET, module, category = %category, "Skipping agent with unknown module");
            report.skipped += 1;
            return None;
        };

        let agent_ref = agent.get(ID_KEY).and_then(Value::as_str).map(AgentRef::new);
        let result = self
            .registry
            .decode(node_type, category, agent)
            .and_then(|config| {
                let mut init = NewNode::with_config(config).persisted(agent_ref);
                init.child_index = child_index;
                graph.add_node(origin, node_type, category, init)
            });

        match result {
            Ok(node) => Some(node.id),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    module,
                    category = %category,
                    error = %error,
                    "Skipping agent that cannot be loaded"
                );
                report.skipped += 1;
                None
            }
        }
    }
}

impl std::fmt::Debug for WorkflowLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowLoader")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

fn is_agent(value: &Config) -> bool {
    value.get(MODULE_KEY).is_some_and(Value::is_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;
    use crate::mock::{CollectingNotifier, MemoryAgentStore, StoreOperation};
    use crate::node::NodePatch;
    use crate::reconcile::{Reconciler, ReconcilerConfig};

    fn loader(store: Arc<MemoryAgentStore>) -> (SharedGraph, WorkflowLoader) {
        let graph = SharedGraph::default();
        let loader = WorkflowLoader::new(graph.clone(), store, Arc::new(NodeRegistry::standard()));
        (graph, loader)
    }

    #[tokio::test]
    async fn nested_agents_become_children() {
        let store = Arc::new(MemoryAgentStore::new().with_agents(
            NodeCategory::Preprocess,
            [json!({
                "id": "cond-1",
                "module": "pre_conditional",
                "prompt": "mentions a date?",
                "then": [
                    { "id": "h-1", "module": "historical", "all": true },
                    { "module": "pre_conditional", "prompt": "inner", "then": [{ "module": "historical" }] }
                ],
                "else_": [],
                "fallback": { "module": "rephrase", "model": "m" }
            })],
        ));
        let (graph, loader) = loader(store);

        let report = loader.load().await;
        assert_eq!(report.roots, 1);
        assert_eq!(report.children, 4);
        assert_eq!(report.skipped, 0);

        graph
            .read(|g| {
                g.check_invariants().unwrap();
                assert!(g.is_ready());
                let root = g.roots(NodeCategory::Preprocess).next().unwrap();
                assert_eq!(root.agent_ref, Some(AgentRef::new("cond-1")));
                assert!(root.is_saved);
                assert_eq!(root.children_in(&Slot::Then).len(), 2);
                assert_eq!(root.children_in(&Slot::Fallback).len(), 1);

                let first = g.node(root.children_in(&Slot::Then)[0]).unwrap();
                assert_eq!(first.agent_ref, Some(AgentRef::new("h-1")));
                assert_eq!(first.parent.as_ref().unwrap().child_index, Some(0));
                assert!(first.is_saved);

                let inner = g.node(root.children_in(&Slot::Then)[1]).unwrap();
                assert_eq!(inner.children_in(&Slot::Then).len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn loaded_graph_reconciles_to_nothing() {
        let store = Arc::new(
            MemoryAgentStore::new()
                .with_agents(
                    NodeCategory::Context,
                    [json!({
                        "id": "c-1",
                        "module": "context_conditional",
                        "prompt": "p",
                        "rules": null,
                        "then": [{ "id": "s-1", "module": "sql", "description": "orders", "retries": 3, "rules": null }]
                    })],
                )
                .with_agents(NodeCategory::Generation, [json!({ "id": "g-1", "module": "generate" })]),
        );
        let (graph, loader) = loader(store.clone());
        loader.load().await;

        let reconciler = Reconciler::new(
            graph.clone(),
            store.clone(),
            Arc::new(NodeRegistry::standard()),
            ReconcilerConfig::default(),
        );
        let report = reconciler.reconcile().await;
        assert!(report.is_idle());
        assert_eq!(store.calls(StoreOperation::Add), 0);
        assert_eq!(store.calls(StoreOperation::Patch), 0);
    }

    #[tokio::test]
    async fn unmapped_embedded_agents_survive_sibling_edits() {
        let store = Arc::new(MemoryAgentStore::new().with_agents(
            NodeCategory::Context,
            [json!({
                "id": "c-1",
                "module": "context_conditional",
                "prompt": "p",
                "then": [
                    { "id": "s-1", "module": "sql", "description": "orders", "retries": 3, "rules": null },
                    { "id": "f-1", "module": "future_module", "depth": 2 }
                ],
                "fallback": { "note": "kept" }
            })],
        ));
        let (graph, loader) = loader(store.clone());
        let report = loader.load().await;
        assert_eq!(report.children, 1);
        assert_eq!(report.skipped, 1);

        let sql = graph
            .read(|g| {
                let root = g.roots(NodeCategory::Context).next().unwrap();
                assert_eq!(root.retained.len(), 2);
                root.children_in(&Slot::Then)[0]
            })
            .await;
        graph
            .update(|g| {
                g.update_node(
                    sql,
                    NodeCategory::Context,
                    NodePatch::config(object(json!({ "source": "db", "prompt": "invoices" }))),
                )
            })
            .await
            .unwrap();

        let reconciler = Reconciler::new(
            graph.clone(),
            store.clone(),
            Arc::new(NodeRegistry::standard()),
            ReconcilerConfig::default(),
        );
        assert_eq!(reconciler.reconcile().await.updated, 1);

        let agent = &store.agents(NodeCategory::Context)[0];
        let then = agent["then"].as_array().unwrap();
        assert_eq!(then.len(), 2);
        assert_eq!(then[0]["description"], "invoices");
        assert_eq!(then[1], json!({ "id": "f-1", "module": "future_module", "depth": 2 }));
        assert_eq!(agent["fallback"], json!({ "note": "kept" }));
    }

    #[tokio::test]
    async fn unknown_modules_and_failed_categories_are_skipped() {
        let store = Arc::new(MemoryAgentStore::new().with_agents(
            NodeCategory::Postprocess,
            [
                json!({ "id": "x", "module": "teleport" }),
                json!({ "id": "r-1", "module": "restart" }),
            ],
        ));
        store.fail(StoreOperation::List);
        let notifier = Arc::new(CollectingNotifier::new());
        let (graph, loader) = loader(store.clone());
        let loader = loader.with_notifier(notifier.clone());

        let report = loader.load().await;
        assert_eq!(report.failed_categories.len(), 4);
        assert_eq!(notifier.len(), 4);
        assert!(graph.read(|g| g.is_ready() && g.is_empty()).await);

        store.recover(StoreOperation::List);
        let report = loader.load().await;
        assert_eq!(report.roots, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.failed_categories.is_empty());
    }

    #[tokio::test]
    async fn load_replaces_previous_graph() {
        let store = Arc::new(MemoryAgentStore::new().with_agents(
            NodeCategory::Generation,
            [json!({ "id": "g-1", "module": "summarize" })],
        ));
        let (graph, loader) = loader(store);
        graph
            .update(|g| g.add_node(Origin::Root, NodeType::Generate, NodeCategory::Generation, NewNode::default()))
            .await
            .unwrap();

        loader.load().await;
        let snapshot = graph.snapshot().await;
        assert_eq!(snapshot.generation.len(), 1);
        assert_eq!(snapshot.generation[0].node_type, NodeType::Summarize);
    }
}
