//! Conversion between UI-shaped node configuration and backend agents.
//!
//! Each node type owns an [`AgentCodec`]. Types without a dedicated codec
//! use [`IdentityCodec`], which only attaches or strips the `module` tag.
//! Codecs are looked up through the [`NodeRegistry`](crate::NodeRegistry),
//! which also runs [`cleanup`] on every configuration before encoding.

mod ask;
mod cleanup;
mod conditional;
mod external;
mod guardrails;
mod identity;
mod internet;
mod mcp;
mod rephrase;
mod sql;

pub use ask::{AskCodec, BasicAskCodec};
pub use cleanup::cleanup;
pub use conditional::ConditionalCodec;
pub use external::ExternalCodec;
pub use guardrails::GuardrailsCodec;
pub use identity::IdentityCodec;
pub use internet::InternetCodec;
pub use mcp::McpCodec;
pub use rephrase::RephraseCodec;
pub use sql::SqlCodec;
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::node::{Config, NodeCategory, NodeType};

/// Backend key holding the agent's module tag.
pub const MODULE_KEY: &str = "module";

/// Backend key holding the agent's identifier.
pub const ID_KEY: &str = "id";

/// Configuration keys that can hold embedded child agents.
pub const CHILD_KEYS: [&str; 7] = [
    "then",
    "else_",
    "else",
    "agents",
    "registered_agents",
    "fallback",
    "next_agent",
];

/// Node type and category an encoding or decoding runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecContext {
    /// Type of the node.
    pub node_type: NodeType,
    /// Category the node lives in.
    pub category: NodeCategory,
}

impl CodecContext {
    /// Creates a new codec context.
    pub const fn new(node_type: NodeType, category: NodeCategory) -> Self {
        Self {
            node_type,
            category,
        }
    }

    /// Creates a configuration error for this context.
    pub fn error(&self, message: impl Into<String>) -> WorkflowError {
        WorkflowError::configuration(self.node_type, self.category, message)
    }
}

/// Bidirectional mapping between a node's UI configuration and its backend agent.
///
/// `to_backend(from_backend(agent))` must reproduce `agent` up to
/// empty-string/null normalization.
pub trait AgentCodec: Send + Sync {
    /// Encodes a cleaned UI configuration into a module-tagged agent payload.
    fn to_backend(&self, ctx: CodecContext, config: Config) -> WorkflowResult<Config>;

    /// Decodes a backend agent (without its `id`) into a UI configuration.
    fn from_backend(&self, ctx: CodecContext, agent: Config) -> WorkflowResult<Config>;
}

/// Builds an agent payload with `module` as the first key.
pub(crate) fn tagged(module: &str, body: Config) -> Config {
    let mut agent = Config::with_capacity(body.len() + 1);
    agent.insert(MODULE_KEY.to_owned(), Value::String(module.to_owned()));
    for (key, value) in body {
        if key != MODULE_KEY {
            agent.insert(key, value);
        }
    }
    agent
}

/// Returns `true` for absent, null or empty-string values.
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Removes `key` when its value is blank.
pub(crate) fn drop_blank(config: &mut Config, key: &str) {
    if is_blank(config.get(key)) {
        config.remove(key);
    }
}

/// Inserts `value` under `key` unless a non-null value is already present.
pub(crate) fn default_to(config: &mut Config, key: &str, value: Value) {
    if config.get(key).is_none_or(Value::is_null) {
        config.insert(key.to_owned(), value);
    }
}

/// Unwraps a JSON object literal in tests.
#[cfg(test)]
pub(crate) fn object(value: Value) -> Config {
    match value {
        Value::Object(object) => object,
        other => panic!("expected a JSON object, got {other}"),
    }
}
