//! External call agent codec.

use serde_json::Value;

use super::{AgentCodec, CodecContext, MODULE_KEY, default_to, tagged};
use crate::error::WorkflowResult;
use crate::node::Config;

const PAYLOAD: &str = "payload";
const CONTEXT: &str = "context";
const CALL_SCHEMA: &str = "call_schema";
const CALL_OBJ: &str = "call_obj";

/// Payload sent along with the external call, as chosen in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    None,
    Context,
    CallSchema,
    CallObj,
}

impl Payload {
    fn parse(ctx: CodecContext, value: Option<&Value>) -> WorkflowResult<Self> {
        match value.and_then(Value::as_str) {
            None | Some("none") => Ok(Self::None),
            Some("context") => Ok(Self::Context),
            Some("call_schema") => Ok(Self::CallSchema),
            Some("call_obj") => Ok(Self::CallObj),
            Some(other) => Err(ctx.error(format!("unknown payload kind: {other}"))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Context => "context",
            Self::CallSchema => "call_schema",
            Self::CallObj => "call_obj",
        }
    }
}

/// Parses a JSON document typed into the form.
fn parse_json(ctx: CodecContext, key: &str, value: Option<Value>) -> WorkflowResult<Option<Value>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| ctx.error(format!("{key} is not valid JSON: {err}"))),
        Some(structured) => Ok(Some(structured)),
    }
}

/// Codec for the `external` module.
///
/// The form picks one payload kind; the backend stores a `context` flag
/// and at most one of `call_schema` / `call_obj` as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalCodec;

impl AgentCodec for ExternalCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        let payload = Payload::parse(ctx, config.get(PAYLOAD))?;
        config.remove(PAYLOAD);
        let call_schema = config.remove(CALL_SCHEMA);
        let call_obj = config.remove(CALL_OBJ);

        config.insert(CONTEXT.to_owned(), Value::Bool(payload == Payload::Context));
        match payload {
            Payload::CallSchema => {
                if let Some(schema) = parse_json(ctx, CALL_SCHEMA, call_schema)? {
                    config.insert(CALL_SCHEMA.to_owned(), schema);
                }
            }
            Payload::CallObj => {
                if let Some(object) = parse_json(ctx, CALL_OBJ, call_obj)? {
                    config.insert(CALL_OBJ.to_owned(), object);
                }
            }
            Payload::None | Payload::Context => {}
        }

        Ok(tagged(ctx.node_type.as_ref(), config))
    }

    fn from_backend(&self, _ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        agent.remove(MODULE_KEY);
        let call_schema = agent.remove(CALL_SCHEMA).filter(|value| !value.is_null());
        let call_obj = agent.remove(CALL_OBJ).filter(|value| !value.is_null());

        let payload = if agent.get(CONTEXT).and_then(Value::as_bool).unwrap_or(false) {
            Payload::Context
        } else if call_obj.is_some() {
            Payload::CallObj
        } else if call_schema.is_some() {
            Payload::CallSchema
        } else {
            Payload::None
        };

        agent.insert(PAYLOAD.to_owned(), Value::String(payload.as_str().to_owned()));
        if let Some(schema) = call_schema {
            agent.insert(CALL_SCHEMA.to_owned(), Value::String(schema.to_string()));
        }
        if let Some(object) = call_obj {
            agent.insert(CALL_OBJ.to_owned(), Value::String(object.to_string()));
        }
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

    const CTX: CodecContext = CodecContext::new(NodeType::External, NodeCategory::Postprocess);

    #[test]
    fn payload_selects_parsed_field() {
        let agent = ExternalCodec
            .to_backend(
                CTX,
                object(json!({
                    "url": "https://hooks.example.com",
                    "payload": "call_obj",
                    "call_obj": "{\"query\": \"q\"}",
                    "call_schema": "{\"ignored\": true}"
                })),
            )
            .unwrap();
        assert_eq!(
            Value::Object(agent),
            json!({
                "module": "external",
                "url": "https://hooks.example.com",
                "context": false,
                "call_obj": { "query": "q" }
            })
        );
    }

    #[test]
    fn context_payload_sets_flag() {
        let agent = ExternalCodec
            .to_backend(CTX, object(json!({ "url": "u", "payload": "context" })))
            .unwrap();
        assert_eq!(agent["context"], true);
        assert!(!agent.contains_key("call_obj"));
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let error = ExternalCodec
            .to_backend(CTX, object(json!({ "url": "u", "payload": "call_schema", "call_schema": "{" })))
            .unwrap_err();
        assert!(error.is_configuration());
    }

    #[test]
    fn round_trip() {
        let agent = object(json!({
            "module": "external",
            "url": "https://api.example.com/check",
            "method": "POST",
            "context": false,
            "call_schema": { "type": "object", "properties": { "q": { "type": "string" } } },
            "headers": { "x-key": "secret" },
            "rules": null
        }));
        let ui = ExternalCodec.from_backend(CTX, agent.clone()).unwrap();
        assert_eq!(ui["payload"], "call_schema");
        assert_eq!(ExternalCodec.to_backend(CTX, ui).unwrap(), agent);
    }
}
