//! Internet search agent codec.

use serde_json::Value;

use super::{AgentCodec, CHILD_KEYS, CodecContext, MODULE_KEY, tagged};
use crate::error::WorkflowResult;
use crate::node::{Config, INTERNET_PROVIDERS};

const PROVIDER: &str = "provider";
const SOURCE: &str = "source";
const RULES: &str = "rules";

/// Codec for the `internet` node type.
///
/// The form keeps one settings block per provider; the backend agent is
/// tagged with the selected provider's module and carries only its block.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternetCodec;

impl AgentCodec for InternetCodec {
    fn to_backend(&self, ctx: CodecContext, mut config: Config) -> WorkflowResult<Config> {
        let provider = match config.remove(PROVIDER) {
            Some(Value::String(provider)) if INTERNET_PROVIDERS.contains(&provider.as_str()) => provider,
            Some(other) => return Err(ctx.error(format!("unknown internet provider: {other}"))),
            None => return Err(ctx.error("an internet provider must be selected")),
        };

        let settings = match config.remove(&provider) {
            Some(Value::Object(settings)) => settings,
            _ => Config::new(),
        };
        for other in INTERNET_PROVIDERS {
            config.remove(other);
        }

        config.extend(settings);
        Ok(tagged(&provider, config))
    }

    fn from_backend(&self, ctx: CodecContext, mut agent: Config) -> WorkflowResult<Config> {
        let provider = match agent.remove(MODULE_KEY) {
            Some(Value::String(module)) if INTERNET_PROVIDERS.contains(&module.as_str()) => module,
            other => {
                return Err(ctx.error(format!(
                    "agent module {} is not an internet provider",
                    other.unwrap_or(Value::Null)
                )));
            }
        };

        let mut ui = Config::new();
        ui.insert(PROVIDER.to_owned(), Value::String(provider.clone()));
        for key in [SOURCE, RULES].into_iter().chain(CHILD_KEYS) {
            if let Some(value) = agent.remove(key) {
                ui.insert(key.to_owned(), value);
            }
        }
        if !ui.contains_key(RULES) {
            ui.insert(RULES.to_owned(), Value::Null);
        }
        ui.insert(provider, Value::Object(agent));
        Ok(ui)
    }
}
