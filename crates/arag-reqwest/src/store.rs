//! [`AgentStore`] implementation for [`ReqwestAgentStore`].

use arag_workflow::node::{AgentRef, Config, NodeCategory};
use arag_workflow::reconcile::{AgentStore, StoreResult};
use reqwest::Method;
use serde_json::Value;

use crate::client::{ReqwestAgentStore, TRACING_TARGET};
use crate::error::{Error, Result};

impl ReqwestAgentStore {
    async fn fetch_agents(&self, category: NodeCategory) -> Result<Vec<Config>> {
        let url = self.category_url(category)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        parse_agents(response.json().await?)
    }

    async fn create_agent(&self, category: NodeCategory, payload: &Config) -> Result<AgentRef> {
        let url = self.category_url(category)?;
        let response = self.send(self.request(Method::POST, url).json(payload)).await?;
        parse_agent_ref(response.json().await?)
    }

    async fn replace_agent(&self, category: NodeCategory, agent_ref: &AgentRef, payload: &Config) -> Result<()> {
        let url = self.agent_url(category, agent_ref)?;
        self.send(self.request(Method::PATCH, url).json(payload)).await?;
        Ok(())
    }

    async fn remove_agent(&self, category: NodeCategory, agent_ref: &AgentRef) -> Result<()> {
        let url = self.agent_url(category, agent_ref)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

fn parse_agents(body: Value) -> Result<Vec<Config>> {
    let Value::Array(items) = body else {
        return Err(Error::InvalidResponse("expected an array of agents".into()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(agent) => Ok(agent),
            other => Err(Error::InvalidResponse(format!("expected an agent object, got {other}"))),
        })
        .collect()
}

fn parse_agent_ref(body: Value) -> Result<AgentRef> {
    let id = match body {
        Value::Object(mut object) => object.remove("id"),
        other => Some(other),
    };
    match id {
        Some(Value::String(id)) if !id.is_empty() => Ok(AgentRef::new(id)),
        Some(Value::Number(id)) => Ok(AgentRef::new(id.to_string())),
        _ => Err(Error::InvalidResponse("created agent has no id".into())),
    }
}

#[async_trait::async_trait]
impl AgentStore for ReqwestAgentStore {
    async fn list_agents(&self, category: NodeCategory) -> StoreResult<Vec<Config>> {
        let agents = self.fetch_agents(category).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            category = %category,
            count = agents.len(),
            "Agents listed"
        );
        Ok(agents)
    }

    async fn add_agent(&self, category: NodeCategory, payload: Config) -> StoreResult<AgentRef> {
        let agent_ref = self.create_agent(category, &payload).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            category = %category,
            agent_ref = %agent_ref,
            "Agent created"
        );
        Ok(agent_ref)
    }

    async fn patch_agent(&self, category: NodeCategory, agent_ref: &AgentRef, payload: Config) -> StoreResult<()> {
        self.replace_agent(category, agent_ref, &payload).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            category = %category,
            agent_ref = %agent_ref,
            "Agent updated"
        );
        Ok(())
    }

    async fn delete_agent(&self, category: NodeCategory, agent_ref: &AgentRef) -> StoreResult<()> {
        self.remove_agent(category, agent_ref).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            category = %category,
            agent_ref = %agent_ref,
            "Agent deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn created_id_accepts_object_or_bare_value() {
        assert_eq!(parse_agent_ref(json!({ "id": "a-1" })).unwrap(), AgentRef::new("a-1"));
        assert_eq!(parse_agent_ref(json!("a-2")).unwrap(), AgentRef::new("a-2"));
        assert_eq!(parse_agent_ref(json!({ "id": 7 })).unwrap(), AgentRef::new("7"));
        assert!(parse_agent_ref(json!({ "ok": true })).is_err());
    }

    #[test]
    fn agent_list_must_hold_objects() {
        let agents = parse_agents(json!([{ "module": "ask" }])).unwrap();
        assert_eq!(agents[0]["module"], "ask");
        assert!(parse_agents(json!({ "module": "ask" })).is_err());
        assert!(parse_agents(json!(["ask"])).is_err());
    }
}
