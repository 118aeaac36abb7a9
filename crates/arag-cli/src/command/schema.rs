use std::path::Path;

use anyhow::{Context, bail};
use arag_workflow::NodeRegistry;
use arag_workflow::schema::SchemaDocument;
use serde_json::json;

use super::{print_json, read_file};
use crate::TRACING_TARGET_COMMAND;
use crate::config::SchemaCommand;

pub fn execute(command: SchemaCommand) -> anyhow::Result<()> {
    match command {
        SchemaCommand::Types { schema, category } => {
            let doc = load(&schema)?;
            let types = doc.category_node_types(category);
            tracing::debug!(
                target: TRACING_TARGET_COMMAND,
                category = %category,
                count = types.len(),
                "Node types listed"
            );
            print_json(&types)
        }
        SchemaCommand::Form { schema, node } => {
            let doc = load(&schema)?;
            let category = node.category();
            let Some(form) = NodeRegistry::standard().form(&doc, node.node_type, category) else {
                bail!("schema has no definition for {} in {category}", node.node_type);
            };
            print_json(&json!({ "defaults": form.defaults(), "form": form }))
        }
    }
}

fn load(path: &Path) -> anyhow::Result<SchemaDocument> {
    let bytes = read_file(path)?;
    SchemaDocument::from_slice(&bytes).with_context(|| format!("invalid schema document {}", path.display()))
}
