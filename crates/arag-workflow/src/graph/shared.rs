//! Shared, observable graph handle.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use super::{GraphStore, WorkflowSnapshot};

/// Cloneable handle to a [`GraphStore`].
///
/// Closures passed to [`read`](Self::read) and [`update`](Self::update) run
/// synchronously under the lock, so no guard is ever held across an await.
/// Every update that changes the revision is published to subscribers.
#[derive(Debug, Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<GraphStore>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SharedGraph {
    /// Wraps a graph store.
    pub fn new(store: GraphStore) -> Self {
        let (revision, _) = watch::channel(store.revision());
        Self {
            inner: Arc::new(RwLock::new(store)),
            revision: Arc::new(revision),
        }
    }

    /// Runs `f` with shared access to the store.
    pub async fn read<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> R {
        let guard = self.inner.read().await;
        f(&guard)
    }

    /// Runs `f` with exclusive access to the store and publishes the new
    /// revision if it changed.
    pub async fn update<R>(&self, f: impl FnOnce(&mut GraphStore) -> R) -> R {
        let mut guard = self.inner.write().await;
        let before = guard.revision();
        let result = f(&mut guard);
        let after = guard.revision();
        drop(guard);

        if after != before {
            self.revision.send_replace(after);
        }
        result
    }

    /// Returns a serializable copy of the graph.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.read(GraphStore::snapshot).await
    }

    /// Returns the current graph revision.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribes to revision changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for SharedGraph {
    fn default() -> Self {
        Self::new(GraphStore::default())
    }
}

impl From<GraphStore> for SharedGraph {
    fn from(store: GraphStore) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Origin;
    use crate::node::{NewNode, NodeCategory, NodeType};

    #[tokio::test]
    async fn update_publishes_revision() {
        let graph = SharedGraph::default();
        let mut changes = graph.subscribe();

        graph
            .update(|g| g.add_node(Origin::Root, NodeType::Generate, NodeCategory::Generation, NewNode::default()))
            .await
            .unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), graph.revision());

        let count = graph.read(|g| g.len()).await;
        assert_eq!(count, 1);
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn read_only_update_is_silent() {
        let graph = SharedGraph::default();
        let changes = graph.subscribe();
        let ready = graph.update(|g| g.is_ready()).await;
        assert!(!ready);
        assert!(!changes.has_changed().unwrap());
    }
}
