//! Reconciliation engine.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::plan::{SaveKind, SaveRequest, plan};
use super::{
    AgentStore, Notification, Notifier, ReconcileReport, ReconcilerConfig, StoreError, StoreResult, TRACING_TARGET,
    TracingNotifier,
};
use crate::graph::{GraphStore, PendingDeletion, Persisted, SharedGraph};
use crate::node::{AgentRef, NodeId};
use crate::registry::NodeRegistry;

/// Work currently being submitted to the store.
#[derive(Debug, Default)]
struct InFlight {
    nodes: HashSet<NodeId>,
    deletes: bool,
}

enum SaveOutcome {
    Added,
    Updated,
    Failed,
}

/// Keeps the remote agent store in sync with a [`SharedGraph`].
///
/// Each pass embeds modified children into their ancestors, creates or
/// replaces every root whose configuration is complete and unsaved, and
/// drains the deletion queue. Passes are idempotent and may overlap:
/// anything already being submitted is skipped by later passes.
#[derive(Clone)]
pub struct Reconciler {
    graph: SharedGraph,
    store: Arc<dyn AgentStore>,
    registry: Arc<NodeRegistry>,
    notifier: Arc<dyn Notifier>,
    config: ReconcilerConfig,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl Reconciler {
    /// Creates a reconciler that logs failures through [`TracingNotifier`].
    pub fn new(
        graph: SharedGraph,
        store: Arc<dyn AgentStore>,
        registry: Arc<NodeRegistry>,
        mut config: ReconcilerConfig,
    ) -> Self {
        // A zero-permit semaphore would never admit a request.
        config.max_concurrent_requests = config.max_concurrent_requests.max(1);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_requests = config.max_concurrent_requests,
            debounce = ?config.debounce,
            "Reconciler initialized"
        );

        Self {
            graph,
            store,
            registry,
            notifier: Arc::new(TracingNotifier),
            config,
            semaphore,
            in_flight: Arc::default(),
        }
    }

    /// Replaces the notifier failures are reported to.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Returns the reconciler configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Runs one reconciliation pass.
    ///
    /// Failures are reported to the notifier and counted in the report; the
    /// affected nodes stay unsaved and are retried by the next pass.
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::start();
        if !self.graph.read(GraphStore::is_ready).await {
            tracing::trace!(target: TRACING_TARGET, "Graph not ready, skipping pass");
            return report.finish();
        }

        let plan = {
            let mut in_flight = self.in_flight.lock().await;
            let plan = self
                .graph
                .update(|graph| plan(graph, &self.registry, &in_flight.nodes, in_flight.deletes))
                .await;
            in_flight.nodes.extend(plan.saves.iter().map(|save| save.node_id));
            if !plan.deletions.is_empty() {
                in_flight.deletes = true;
            }
            plan
        };

        if plan.is_empty() {
            report.skipped_in_flight = plan.skipped_in_flight;
            return report.finish();
        }

        tracing::debug!(
            target: TRACING_TARGET,
            saves = plan.saves.len(),
            deletions = plan.deletions.len(),
            skipped_in_flight = plan.skipped_in_flight,
            "Reconciliation planned"
        );

        report.skipped_in_flight = plan.skipped_in_flight;
        report.failed += plan.failures.len();
        for failure in plan.failures {
            self.notifier.notify(failure);
        }

        let saves = join_all(plan.saves.into_iter().map(|request| self.save(request)));
        let deletes = self.delete_batch(plan.deletions);
        let (outcomes, (deleted, failed_deletes)) = tokio::join!(saves, deletes);

        for outcome in outcomes {
            match outcome {
                SaveOutcome::Added => report.added += 1,
                SaveOutcome::Updated => report.updated += 1,
                SaveOutcome::Failed => report.failed += 1,
            }
        }
        report.deleted = deleted;
        report.failed += failed_deletes;

        let report = report.finish();
        tracing::info!(
            target: TRACING_TARGET,
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failed,
            "Reconciliation pass completed"
        );
        report
    }

    async fn save(&self, request: SaveRequest) -> SaveOutcome {
        let result = self.submit(&request).await;
        let outcome = match result {
            Ok(agent_ref) => {
                self.record_success(&request, agent_ref).await;
                match request.kind {
                    SaveKind::Add => SaveOutcome::Added,
                    SaveKind::Update(_) => SaveOutcome::Updated,
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    node_id = %request.node_id,
                    node_type = %request.node_type,
                    category = %request.category,
                    error = %error,
                    "Failed to save node"
                );
                self.notifier.notify(Notification::error(
                    format!("Failed to save {} node", request.node_type),
                    error.to_string(),
                ));
                SaveOutcome::Failed
            }
        };

        self.in_flight.lock().await.nodes.remove(&request.node_id);
        outcome
    }

    async fn submit(&self, request: &SaveRequest) -> StoreResult<Option<AgentRef>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| StoreError::unavailable().with_message("request limiter closed").with_source(e))?;

        match &request.kind {
            SaveKind::Add => self
                .store
                .add_agent(request.category, request.payload.clone())
                .await
                .map(Some),
            SaveKind::Update(agent_ref) => self
                .store
                .patch_agent(request.category, agent_ref, request.payload.clone())
                .await
                .map(|()| None),
        }
    }

    async fn record_success(&self, request: &SaveRequest, agent_ref: Option<AgentRef>) {
        let persisted = self
            .graph
            .update(|graph| {
                let persisted = graph.mark_persisted(request.node_id, agent_ref.clone(), request.revision);
                match persisted {
                    Persisted::Missing => {
                        if let Some(agent_ref) = &agent_ref {
                            graph.enqueue_deletion(PendingDeletion::new(agent_ref.clone(), request.category));
                        }
                    }
                    Persisted::Saved | Persisted::Modified => {
                        for (child, revision) in &request.embedded {
                            graph.mark_persisted(*child, None, *revision);
                        }
                    }
                }
                persisted
            })
            .await;

        match persisted {
            Persisted::Saved => tracing::debug!(
                target: TRACING_TARGET,
                node_id = %request.node_id,
                agent_ref = ?agent_ref,
                "Node saved"
            ),
            Persisted::Modified => tracing::debug!(
                target: TRACING_TARGET,
                node_id = %request.node_id,
                "Node changed while saving, keeping it unsaved"
            ),
            Persisted::Missing => tracing::warn!(
                target: TRACING_TARGET,
                node_id = %request.node_id,
                agent_ref = ?agent_ref,
                "Node deleted while saving, queueing the created agent for deletion"
            ),
        }
    }

    /// Deletes a batch of agents; the batch leaves the queue only if every
    /// deletion succeeded. Returns the deleted and failed counts.
    async fn delete_batch(&self, batch: Vec<PendingDeletion>) -> (usize, usize) {
        if batch.is_empty() {
            return (0, 0);
        }

        let results = join_all(batch.iter().map(|deletion| async move {
            let _permit = self.semaphore.acquire().await.map_err(|e| {
                StoreError::unavailable()
                    .with_message("request limiter closed")
                    .with_source(e)
            })?;
            self.store.delete_agent(deletion.category, &deletion.agent_ref).await
        }))
        .await;

        let failures: Vec<(&PendingDeletion, StoreError)> = batch
            .iter()
            .zip(results)
            .filter_map(|(deletion, result)| match result {
                Ok(()) => None,
                Err(error) if error.is_not_found() => None,
                Err(error) => Some((deletion, error)),
            })
            .collect();

        let outcome = if failures.is_empty() {
            self.graph
                .update(|graph| graph.retain_pending(|deletion| !batch.contains(deletion)))
                .await;
            tracing::debug!(target: TRACING_TARGET, count = batch.len(), "Agents deleted");
            (batch.len(), 0)
        } else {
            for (deletion, error) in &failures {
                tracing::warn!(
                    target: TRACING_TARGET,
                    agent_ref = %deletion.agent_ref,
                    category = %deletion.category,
                    error = %error,
                    "Failed to delete agent"
                );
            }
            let details: Vec<String> = failures
                .iter()
                .map(|(deletion, error)| format!("{}: {error}", deletion.agent_ref))
                .collect();
            self.notifier.notify(Notification::error(
                "Failed to delete agents",
                details.join("; "),
            ));
            (0, failures.len())
        };

        self.in_flight.lock().await.deletes = false;
        outcome
    }

    /// Reconciles after every graph change until `cancel` fires.
    ///
    /// Changes are debounced by [`ReconcilerConfig::debounce`]. A first pass
    /// runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut changes = self.graph.subscribe();
        tracing::info!(target: TRACING_TARGET, "Reconciler started");

        loop {
            changes.borrow_and_update();
            self.reconcile().await;

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                () = tokio::time::sleep(self.config.debounce) => {}
            }
        }

        tracing::info!(target: TRACING_TARGET, "Reconciler stopped");
    }

    /// Spawns [`run`](Self::run) as a background task.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let reconciler = self.clone();
        tokio::spawn(async move { reconciler.run(cancel).await })
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
