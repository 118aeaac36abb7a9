//! Node type registry.
//!
//! Maps every [`NodeType`] to the codec translating its configuration and
//! the builder producing its form. Adding a node type means registering one
//! [`NodeDescriptor`]; nothing else dispatches on the type.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use strum::IntoEnumIterator;

use crate::codec::{
    AgentCodec, AskCodec, BasicAskCodec, CodecContext, ConditionalCodec, ExternalCodec,
    GuardrailsCodec, ID_KEY, IdentityCodec, InternetCodec, McpCodec, RephraseCodec, SqlCodec,
    cleanup,
};
use crate::error::WorkflowResult;
use crate::node::{AgentRef, Config, NodeCategory, NodeType};
use crate::schema::{FormBuilder, NodeForm, SchemaDocument, SchemaFormBuilder};

/// Behaviour attached to a node type.
#[derive(Clone)]
pub struct NodeDescriptor {
    /// Configuration codec.
    pub codec: Arc<dyn AgentCodec>,
    /// Form builder.
    pub form: Arc<dyn FormBuilder>,
}

impl NodeDescriptor {
    /// Creates a descriptor with the given codec and the schema form builder.
    pub fn new(codec: impl AgentCodec + 'static) -> Self {
        Self {
            codec: Arc::new(codec),
            form: Arc::new(SchemaFormBuilder),
        }
    }

    /// Replaces the form builder.
    pub fn with_form(mut self, form: impl FormBuilder + 'static) -> Self {
        self.form = Arc::new(form);
        self
    }
}

impl std::fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDescriptor").finish_non_exhaustive()
    }
}

impl Default for NodeDescriptor {
    fn default() -> Self {
        Self::new(IdentityCodec)
    }
}

/// Registry of node type descriptors.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    descriptors: HashMap<NodeType, NodeDescriptor>,
    fallback: NodeDescriptor,
}

impl NodeRegistry {
    /// Creates an empty registry; every type uses the identity codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in node type.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for node_type in NodeType::iter() {
            let descriptor = match node_type {
                NodeType::Rephrase => NodeDescriptor::new(RephraseCodec),
                NodeType::Ask => NodeDescriptor::new(AskCodec),
                NodeType::BasicAsk => NodeDescriptor::new(BasicAskCodec),
                NodeType::Mcp => NodeDescriptor::new(McpCodec),
                NodeType::Sql => NodeDescriptor::new(SqlCodec),
                NodeType::External => NodeDescriptor::new(ExternalCodec),
                NodeType::Internet => NodeDescriptor::new(InternetCodec),
                NodeType::PreprocessAlinia | NodeType::PostprocessAlinia => {
                    NodeDescriptor::new(GuardrailsCodec)
                }
                NodeType::PreConditional
                | NodeType::ContextConditional
                | NodeType::PostConditional => NodeDescriptor::new(ConditionalCodec),
                _ => NodeDescriptor::default(),
            };
            registry.register(node_type, descriptor);
        }
        registry
    }

    /// Registers or replaces the descriptor of a node type.
    pub fn register(&mut self, node_type: NodeType, descriptor: NodeDescriptor) -> &mut Self {
        self.descriptors.insert(node_type, descriptor);
        self
    }

    /// Returns the descriptor of a node type.
    pub fn descriptor(&self, node_type: NodeType) -> &NodeDescriptor {
        self.descriptors.get(&node_type).unwrap_or(&self.fallback)
    }

    /// Encodes a UI configuration into a module-tagged backend payload.
    ///
    /// Empty strings are normalized to `null` first. When `agent_ref` is
    /// given it is written as the payload's `id`, as required for agents
    /// embedded in a parent.
    pub fn encode(
        &self,
        node_type: NodeType,
        category: NodeCategory,
        config: &Config,
        agent_ref: Option<&AgentRef>,
    ) -> WorkflowResult<Config> {
        let ctx = CodecContext::new(node_type, category);
        let mut agent = self
            .descriptor(node_type)
            .codec
            .to_backend(ctx, cleanup(config.clone()))?;
        if let Some(agent_ref) = agent_ref {
            agent.insert(ID_KEY.to_owned(), Value::String(agent_ref.to_string()));
        }
        Ok(agent)
    }

    /// Decodes a backend agent into a UI configuration.
    ///
    /// The agent's `id` is not part of the configuration and is dropped.
    pub fn decode(&self, node_type: NodeType, category: NodeCategory, agent: &Config) -> WorkflowResult<Config> {
        let ctx = CodecContext::new(node_type, category);
        let mut agent = agent.clone();
        agent.remove(ID_KEY);
        self.descriptor(node_type).codec.from_backend(ctx, agent)
    }

    /// Builds the configuration form of a node type.
    pub fn form(&self, doc: &SchemaDocument, node_type: NodeType, category: NodeCategory) -> Option<NodeForm> {
        self.descriptor(node_type).form.build(doc, node_type, category)
    }
}
