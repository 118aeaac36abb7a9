//! MCP agent codec.

use super::{AgentCodec, CodecContext, MODULE_KEY, drop_blank, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

/// Codec for the `mcp` module; unset model fields are omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpCodec;

impl AgentCodec for McpCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        drop_blank(&mut config, "summarize_model");
        drop_blank(&mut config, "tool_choice_model");
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::codec::object;
    use crate::node::{NodeCategory, NodeType};

    const CTX: CodecContext = CodecContext::new(NodeType::Mcp, NodeCategory::Context);

    #[test]
    fn drops_unset_models() {
        let agent = McpCodec
            .to_backend(
                CTX,
                object(json!({ "source": "srv", "transport": "SSE", "summarize_model": null, "tool_choice_model": "m" })),
            )
            .unwrap();
        assert_eq!(
            Value::Object(agent),
            json!({ "module": "mcp", "source": "srv", "transport": "SSE", "tool_choice_model": "m" })
        );
    }

    #[test]
    fn round_trip() {
        let agent = object(json!({ "module": "mcp", "source": "srv", "transport": "STDIO", "rules": null }));
        let ui = McpCodec.from_backend(CTX, agent.clone()).unwrap();
        assert_eq!(McpCodec.to_backend(CTX, ui).unwrap(), agent);
    }
}
