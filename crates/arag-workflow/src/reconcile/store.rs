//! Remote agent store abstraction.

use async_trait::async_trait;

use super::StoreResult;
use crate::node::{AgentRef, Config, NodeCategory};

/// Backend persisting the agents of each pipeline category.
///
/// Payloads are module-tagged agent objects as produced by the
/// [`NodeRegistry`](crate::NodeRegistry).
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Lists the agents of a category in pipeline order.
    async fn list_agents(&self, category: NodeCategory) -> StoreResult<Vec<Config>>;

    /// Creates an agent and returns its identifier.
    async fn add_agent(&self, category: NodeCategory, payload: Config) -> StoreResult<AgentRef>;

    /// Replaces an existing agent.
    async fn patch_agent(&self, category: NodeCategory, agent_ref: &AgentRef, payload: Config) -> StoreResult<()>;

    /// Removes an agent.
    async fn delete_agent(&self, category: NodeCategory, agent_ref: &AgentRef) -> StoreResult<()>;
}
