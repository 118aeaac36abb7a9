//! Conditional agent codec.

use super::{AgentCodec, CodecContext, MODULE_KEY, tagged};
use crate::error::WorkflowResult;
use crate::node::{Config, NodeType};

/// Codec for the `pre_conditional`, `context_conditional` and
/// `post_conditional` modules.
///
/// The same form edits all three; the module is derived from the category
/// and the embedded `then`/`else_` agents pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalCodec;

impl ConditionalCodec {
    fn module(ctx: CodecContext) -> WorkflowResult<NodeType> {
        match NodeType::conditional_for(ctx.category) {
            Some(node_type) if node_type == ctx.node_type => Ok(node_type),
            Some(expected) => Err(ctx.error(format!(
                "conditional nodes in {} must use the {expected} module",
                ctx.category
            ))),
            None => Err(ctx.error(format!("{} has no conditional node", ctx.category))),
        }
    }
}

impl AgentCodec for ConditionalCodec {
    fn to_backend(&self, ctx: CodecContext, config: Config) -> WorkflowResult<Config> {
        let module = Self::module(ctx)?;
        Ok(tagged(module.as_ref(), config))
    }

    fn from_backend(&self, ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        Self::module(ctx)?;
        agent.remove(MODULE_KEY);
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;
    use crate::node::NodeCategory;

    #[test]
    fn module_is_derived_from_category() {
        let ctx = CodecContext::new(NodeType::PostConditional, NodeCategory::Postprocess);
        let agent = ConditionalCodec
            .to_backend(ctx, object(json!({ "prompt": "is it long?" })))
            .unwrap();
        assert_eq!(agent["module"], "post_conditional");
    }

    #[test]
    fn generation_has_no_conditional() {
        let ctx = CodecContext::new(NodeType::PreConditional, NodeCategory::Generation);
        let error = ConditionalCodec
            .to_backend(ctx, object(json!({ "prompt": "x" })))
            .unwrap_err();
        assert!(error.is_configuration());

        let swapped = CodecContext::new(NodeType::PreConditional, NodeCategory::Context);
        assert!(ConditionalCodec.to_backend(swapped, object(json!({}))).is_err());
    }

    #[test]
    fn round_trip() {
        let ctx = CodecContext::new(NodeType::PreConditional, NodeCategory::Preprocess);
        let agent = object(json!({
            "module": "pre_conditional",
            "prompt": "Does the question mention a date?",
            "rules": null,
            "then": [{ "module": "historical", "all": true, "id": "a-1" }],
            "else_": []
        }));
        let ui = ConditionalCodec.from_backend(ctx, agent.clone()).unwrap();
        assert_eq!(ConditionalCodec.to_backend(ctx, ui).unwrap(), agent);
    }
}
