//! SQL agent codec.

use serde_json::Value;

use super::{AgentCodec, CodecContext, MODULE_KEY, default_to, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

/// Retries used when the backend does not report any.
pub const DEFAULT_SQL_RETRIES: u64 = 3;

/// Codec for the `sql` module.
///
/// The form edits the agent's `description` under the name `prompt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCodec;

impl AgentCodec for SqlCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        if let Some(prompt) = config.remove("prompt") {
            config.insert("description".to_owned(), prompt);
        }
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        let description = agent
            .remove("description")
            .filter(|value| !value.is_null())
            .unwrap_or_else(|| Value::String(String::new()));
        agent.insert("prompt".to_owned(), description);

        let retries = agent
            .get("retries")
            .and_then(Value::as_u64)
            .filter(|retries| *retries > 0)
            .unwrap_or(DEFAULT_SQL_RETRIES);
        agent.insert("retries".to_owned(), Value::from(retries));
        default_to(&mut agent, "rules", Value::Null);
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;
    use crate::node::{NodeCategory, NodeType};

    const CTX: CodecContext = CodecContext::new(NodeType::Sql, NodeCategory::Context);

    #[test]
    fn prompt_becomes_description() {
        let agent = SqlCodec
            .to_backend(CTX, object(json!({ "source": "db", "prompt": "sales tables", "retries": 2 })))
            .unwrap();
        assert_eq!(agent["description"], "sales tables");
        assert!(!agent.contains_key("prompt"));
    }

    #[test]
    fn decode_defaults_retries() {
        let ui = SqlCodec
            .from_backend(CTX, object(json!({ "module": "sql", "source": "db" })))
            .unwrap();
        assert_eq!(ui["retries"], 3);
        assert_eq!(ui["prompt"], "");
        assert_eq!(ui["rules"], Value::Null);
    }

    #[test]
    fn round_trip() {
        let agent = object(json!({
            "module": "sql",
            "source": "warehouse",
            "description": "Orders and customers",
            "retries": 5,
            "rules": null,
            "ignore_tables": ["audit"],
            "include_tables": []
        }));
        let ui = SqlCodec.from_backend(CTX, agent.clone()).unwrap();
        assert_eq!(SqlCodec.to_backend(CTX, ui).unwrap(), agent);
    }
}
