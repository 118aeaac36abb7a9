use anyhow::Context;
use arag_workflow::NodeRegistry;
use arag_workflow::node::Config;

use super::{print_json, read_file};
use crate::TRACING_TARGET_COMMAND;
use crate::config::{CodecArgs, CodecCommand};

pub fn execute(command: CodecCommand) -> anyhow::Result<()> {
    let registry = NodeRegistry::standard();
    let (direction, args) = match &command {
        CodecCommand::Encode(args) => ("encode", args),
        CodecCommand::Decode(args) => ("decode", args),
    };

    let input = read_input(args)?;
    let node_type = args.node.node_type;
    let category = args.node.category();
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        direction,
        node_type = %node_type,
        category = %category,
        "Converting configuration"
    );

    let output = match command {
        CodecCommand::Encode(_) => registry.encode(node_type, category, &input, None),
        CodecCommand::Decode(_) => registry.decode(node_type, category, &input),
    }
    .with_context(|| format!("failed to {direction} {node_type}"))?;

    print_json(&output)
}

fn read_input(args: &CodecArgs) -> anyhow::Result<Config> {
    let bytes = read_file(&args.input)?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} does not hold a JSON object", args.input.display()))
}
