//! Pass-through codec.

use super::{AgentCodec, CodecContext, MODULE_KEY, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

/// Attaches the node type as `module` on encode and strips it on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl AgentCodec for IdentityCodec {
    fn to_backend(&self, ctx: CodecContext, config: Config) -> WorkflowResult<Config> {
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        Ok(agent)
    }
}
