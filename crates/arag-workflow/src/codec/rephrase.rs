//! Question rephrasing codec.

use serde_json::Value;

use super::{AgentCodec, CodecContext, MODULE_KEY, default_to, drop_blank, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

const USER_INFO: &str = "userInfo";
const SESSION_INFO: &str = "session_info";
const TOGGLES: [&str; 4] = ["extend", "synonyms", "history", "split_question"];

/// Codec for the `rephrase` module.
///
/// The form's `userInfo` toggle is stored as `session_info`; resource and
/// label filters are not editable and default to empty lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct RephraseCodec;

impl AgentCodec for RephraseCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        let user_info = config.remove(USER_INFO).unwrap_or(Value::Bool(false));
        config.insert(SESSION_INFO.to_owned(), user_info);
        default_to(&mut config, "rids", Value::Array(Vec::new()));
        default_to(&mut config, "labels", Value::Array(Vec::new()));
        drop_blank(&mut config, "model");
        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        let session_info = agent.remove(SESSION_INFO).filter(|value| !value.is_null());
        agent.insert(
            USER_INFO.to_owned(),
            session_info.unwrap_or(Value::Bool(false)),
        );
        for toggle in TOGGLES {
            default_to(&mut agent, toggle, Value::Bool(false));
        }
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;
    use crate::node::{NodeCategory, NodeType};

    const CTX: CodecContext = CodecContext::new(NodeType::Rephrase, NodeCategory::Preprocess);

    #[test]
    fn maps_user_info_and_defaults_lists() {
        let agent = RephraseCodec
            .to_backend(
                CTX,
                object(json!({ "kb": "kb-1", "userInfo": true, "extend": false, "model": null })),
            )
            .unwrap();
        assert_eq!(
            Value::Object(agent),
            json!({
                "module": "rephrase",
                "kb": "kb-1",
                "extend": false,
                "session_info": true,
                "rids": [],
                "labels": []
            })
        );
    }

    #[test]
    fn decode_defaults_toggles() {
        let ui = RephraseCodec
            .from_backend(CTX, object(json!({ "module": "rephrase", "kb": "kb-1" })))
            .unwrap();
        assert_eq!(ui["userInfo"], false);
        assert_eq!(ui["split_question"], false);
        assert!(!ui.contains_key("module"));
    }

    #[test]
    fn round_trip() {
        let agent = object(json!({
            "module": "rephrase",
            "kb": "kb-1",
            "extend": true,
            "synonyms": false,
            "history": true,
            "split_question": false,
            "session_info": true,
            "rids": ["r1"],
            "labels": [],
            "model": "chatgpt-azure-4o",
            "rules": null
        }));
        let ui = RephraseCodec.from_backend(CTX, agent.clone()).unwrap();
        assert_eq!(RephraseCodec.to_backend(CTX, ui).unwrap(), agent);
    }
}
