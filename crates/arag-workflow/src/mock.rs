//! In-memory test doubles for the agent store and notifier.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::codec::ID_KEY;
use crate::node::{AgentRef, Config, NodeCategory};
use crate::reconcile::{AgentStore, Notification, Notifier, StoreError, StoreResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operation of the [`AgentStore`] trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    List,
    Add,
    Patch,
    Delete,
}

/// Agent store keeping agents in memory.
///
/// Calls are counted on entry. Operations can be made to fail, and
/// [`hold`](Self::hold) keeps every call waiting until
/// [`release`](Self::release), which lets tests observe requests in flight.
#[derive(Debug)]
pub struct MemoryAgentStore {
    agents: Mutex<HashMap<NodeCategory, Vec<Config>>>,
    calls: Mutex<HashMap<StoreOperation, usize>>,
    failing: Mutex<HashSet<StoreOperation>>,
    gate: watch::Sender<bool>,
    next_id: AtomicUsize,
}

impl Default for MemoryAgentStore {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            agents: Mutex::default(),
            calls: Mutex::default(),
            failing: Mutex::default(),
            gate,
            next_id: AtomicUsize::new(1),
        }
    }
}

impl MemoryAgentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a category with agents; non-object values are ignored.
    pub fn with_agents(self, category: NodeCategory, agents: impl IntoIterator<Item = Value>) -> Self {
        let agents = agents.into_iter().filter_map(|agent| match agent {
            Value::Object(agent) => Some(agent),
            _ => None,
        });
        lock(&self.agents).entry(category).or_default().extend(agents);
        self
    }

    /// Returns the agents of a category.
    pub fn agents(&self, category: NodeCategory) -> Vec<Config> {
        lock(&self.agents).get(&category).cloned().unwrap_or_default()
    }

    /// Returns how many times an operation was called.
    pub fn calls(&self, operation: StoreOperation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or_default()
    }

    /// Makes every call of `operation` fail.
    pub fn fail(&self, operation: StoreOperation) {
        lock(&self.failing).insert(operation);
    }

    /// Makes `operation` succeed again.
    pub fn recover(&self, operation: StoreOperation) {
        lock(&self.failing).remove(&operation);
    }

    /// Holds every subsequent call until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Lets held calls proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    async fn enter(&self, operation: StoreOperation) -> StoreResult<()> {
        *lock(&self.calls).entry(operation).or_default() += 1;

        let mut gate = self.gate.subscribe();
        let opened = gate.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(StoreError::unavailable().with_message("store closed"));
        }

        if lock(&self.failing).contains(&operation) {
            return Err(StoreError::unavailable().with_message(format!("injected {operation:?} failure")));
        }
        Ok(())
    }

    fn position(agents: &[Config], agent_ref: &AgentRef) -> Option<usize> {
        agents
            .iter()
            .position(|agent| agent.get(ID_KEY).and_then(Value::as_str) == Some(agent_ref.as_str()))
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn list_agents(&self, category: NodeCategory) -> StoreResult<Vec<Config>> {
        self.enter(StoreOperation::List).await?;
        Ok(self.agents(category))
    }

    async fn add_agent(&self, category: NodeCategory, mut payload: Config) -> StoreResult<AgentRef> {
        self.enter(StoreOperation::Add).await?;
        let agent_ref = AgentRef::new(format!("agent-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        payload.insert(ID_KEY.to_owned(), Value::String(agent_ref.to_string()));
        lock(&self.agents).entry(category).or_default().push(payload);
        Ok(agent_ref)
    }

    async fn patch_agent(&self, category: NodeCategory, agent_ref: &AgentRef, mut payload: Config) -> StoreResult<()> {
        self.enter(StoreOperation::Patch).await?;
        let mut agents = lock(&self.agents);
        let agents = agents.entry(category).or_default();
        let index = Self::position(agents, agent_ref)
            .ok_or_else(|| StoreError::not_found().with_message(format!("agent {agent_ref}")))?;
        payload.insert(ID_KEY.to_owned(), Value::String(agent_ref.to_string()));
        agents[index] = payload;
        Ok(())
    }

    async fn delete_agent(&self, category: NodeCategory, agent_ref: &AgentRef) -> StoreResult<()> {
        self.enter(StoreOperation::Delete).await?;
        let mut agents = lock(&self.agents);
        let agents = agents.entry(category).or_default();
        let index = Self::position(agents, agent_ref)
            .ok_or_else(|| StoreError::not_found().with_message(format!("agent {agent_ref}")))?;
        agents.remove(index);
        Ok(())
    }
}

/// Notifier recording every notification.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notifications received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    /// Returns the number of notifications received.
    pub fn len(&self) -> usize {
        lock(&self.notifications).len()
    }

    /// Returns `true` if nothing was received.
    pub fn is_empty(&self) -> bool {
        lock(&self.notifications).is_empty()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}
