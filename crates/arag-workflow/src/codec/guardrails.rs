//! Guardrail agent codec.

use serde_json::Value;

use super::{AgentCodec, CHILD_KEYS, CodecContext, MODULE_KEY, tagged};
use crate::error::WorkflowResult;
use crate::node::{Config, NodeCategory, NodeType};

/// Only guardrail provider currently available.
pub const GUARDRAILS_PROVIDER: &str = "alinia";

/// Preconfigurations accepted for preprocess guardrails.
pub const PREPROCESS_PRECONFIGS: [&str; 2] = ["INAPPROPRIATE", "CUSTOM"];

const PROVIDER: &str = "provider";
const CATEGORY: &str = "category";
const RULES: &str = "rules";

/// Codec for the `preprocess_alinia` and `postprocess_alinia` modules.
///
/// The form edits provider settings under `alinia`; the module tag depends
/// on the category the node lives in.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardrailsCodec;

impl GuardrailsCodec {
    fn module(ctx: CodecContext) -> WorkflowResult<NodeType> {
        match NodeType::guardrails_for(ctx.category) {
            Some(node_type) if node_type == ctx.node_type => Ok(node_type),
            Some(expected) => Err(ctx.error(format!(
                "guardrails in {} must use the {expected} module",
                ctx.category
            ))),
            None => Err(ctx.error("guardrails are only available in preprocess and postprocess")),
        }
    }
}

impl AgentCodec for GuardrailsCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        let module = Self::module(ctx)?;

        if let Some(category) = config.remove(CATEGORY).and_then(|value| value.as_str().map(str::to_owned))
            && category != ctx.category.as_ref()
        {
            return Err(ctx.error(format!(
                "configuration targets {category} but the node lives in {}",
                ctx.category
            )));
        }
        config.remove(PROVIDER);

        let settings = match config.remove(GUARDRAILS_PROVIDER) {
            Some(Value::Object(settings)) => settings,
            None | Some(Value::Null) => Config::new(),
            Some(other) => return Err(ctx.error(format!("{GUARDRAILS_PROVIDER} must be an object, got {other}"))),
        };

        if ctx.category == NodeCategory::Preprocess {
            let preconfig = settings.get("preconfig").and_then(Value::as_str);
            if !preconfig.is_some_and(|preconfig| PREPROCESS_PRECONFIGS.contains(&preconfig)) {
                return Err(ctx.error(format!(
                    "guardrails preconfig {} is not allowed for preprocess {GUARDRAILS_PROVIDER} agent",
                    preconfig.unwrap_or("null")
                )));
            }
        }

        let mut agent = Config::new();
        agent.insert(RULES.to_owned(), config.remove(RULES).unwrap_or(Value::Null));
        agent.extend(settings);
        agent.extend(config);
        Ok(tagged(module.as_ref(), agent))
    }

    fn from_backend(&self, ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        Self::module(ctx)?;
        agent.remove(MODULE_KEY);

        let mut ui = Config::new();
        ui.insert(PROVIDER.to_owned(), Value::String(GUARDRAILS_PROVIDER.to_owned()));
        ui.insert(CATEGORY.to_owned(), Value::String(ctx.category.to_string()));
        ui.insert(RULES.to_owned(), agent.remove(RULES).unwrap_or(Value::Null));
        for key in CHILD_KEYS {
            if let Some(child) = agent.remove(key) {
                ui.insert(key.to_owned(), child);
            }
        }
        ui.insert(GUARDRAILS_PROVIDER.to_owned(), Value::Object(agent));
        Ok(ui)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::object;

    const PRE: CodecContext = CodecContext::new(NodeType::PreprocessAlinia, NodeCategory::Preprocess);
    const POST: CodecContext = CodecContext::new(NodeType::PostprocessAlinia, NodeCategory::Postprocess);

    #[test]
    fn module_follows_category() {
        let ui = json!({
            "provider": "alinia",
            "rules": null,
            "alinia": { "preconfig": "CUSTOM", "source": "drv" }
        });
        let pre = GuardrailsCodec.to_backend(PRE, object(ui.clone())).unwrap();
        assert_eq!(pre["module"], "preprocess_alinia");
        assert_eq!(pre["preconfig"], "CUSTOM");

        let post = GuardrailsCodec.to_backend(POST, object(ui)).unwrap();
        assert_eq!(post["module"], "postprocess_alinia");
    }

    #[test]
    fn invalid_category_fails_fast() {
        let ui = object(json!({ "alinia": { "preconfig": "CUSTOM" } }));
        let context = CodecContext::new(NodeType::PreprocessAlinia, NodeCategory::Context);
        assert!(GuardrailsCodec.to_backend(context, ui.clone()).unwrap_err().is_configuration());

        let swapped = CodecContext::new(NodeType::PostprocessAlinia, NodeCategory::Preprocess);
        assert!(GuardrailsCodec.to_backend(swapped, ui.clone()).unwrap_err().is_configuration());

        let mismatch = object(json!({ "category": "postprocess", "alinia": { "preconfig": "CUSTOM" } }));
        assert!(GuardrailsCodec.to_backend(PRE, mismatch).unwrap_err().is_configuration());
    }

    #[test]
    fn preprocess_requires_supported_preconfig() {
        let ui = object(json!({ "alinia": { "preconfig": "GENERIC" } }));
        assert!(GuardrailsCodec.to_backend(PRE, ui.clone()).unwrap_err().is_configuration());
        assert!(GuardrailsCodec.to_backend(POST, ui).is_ok());
    }

    #[test]
    fn round_trip() {
        let agent = object(json!({
            "module": "postprocess_alinia",
            "rules": ["no pii"],
            "preconfig": "GENERIC",
            "source": "alinia-driver",
            "detection_config": { "safety": { "threshold": 0.5 } }
        }));
        let ui = GuardrailsCodec.from_backend(POST, agent.clone()).unwrap();
        assert_eq!(ui["category"], "postprocess");
        assert_eq!(ui["alinia"]["source"], "alinia-driver");
        assert_eq!(GuardrailsCodec.to_backend(POST, ui).unwrap(), agent);
    }
}
