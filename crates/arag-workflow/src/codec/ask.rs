//! Knowledge-box ask codecs.

use serde_json::Value;

use super::{AgentCodec, CodecContext, MODULE_KEY, default_to, drop_blank, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

const SOURCES: &str = "sources";
const RULES: &str = "rules";

/// Splits the comma-joined `sources` form value into a list.
fn sources_to_list(ctx: CodecContext, config: &mut Config) -> WorkflowResult<()> {
    let sources = match config.remove(SOURCES) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .map(|source| Value::String(source.to_owned()))
            .collect(),
        Some(Value::Array(list)) => list,
        Some(other) => {
            return Err(ctx.error(format!("sources must be a string or a list, got {other}")));
        }
    };
    config.insert(SOURCES.to_owned(), Value::Array(sources));
    Ok(())
}

/// Joins the backend `sources` list into a comma-separated string.
fn sources_to_string(config: &mut Config) {
    let joined = match config.get(SOURCES) {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::String(joined)) => joined.clone(),
        _ => String::new(),
    };
    config.insert(SOURCES.to_owned(), Value::String(joined));
}

/// Codec for the `ask` module.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskCodec;

impl AgentCodec for AskCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        sources_to_list(ctx, &mut config)?;
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        sources_to_string(&mut agent);
        default_to(&mut agent, RULES, Value::Null);
        Ok(agent)
    }
}

/// Codec for the `basic_ask` module.
///
/// Model fields are omitted when unset since the backend rejects `null` models.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAskCodec;

impl AgentCodec for BasicAskCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        sources_to_list(ctx, &mut config)?;
        drop_blank(&mut config, "generative_model");
        drop_blank(&mut config, "summarize_model");
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, ctx: CodecContext, agent: Config) -> WorkflowResult<Config> {
        AskCodec.from_backend(ctx, agent)
    }
}
