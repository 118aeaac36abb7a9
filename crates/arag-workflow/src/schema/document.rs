//! Root schema document and discriminator lookups.

use serde_json::Value;

use super::{DEFS, TRACING_TARGET, discriminator_options};
use crate::error::WorkflowResult;
use crate::node::{NodeCategory, NodeType, Slot};

/// Schema document describing every agent module of the backend.
///
/// Expected layout:
///
/// ```text
/// {
///   "properties": {
///     "<category>": { "items": { "discriminator": { "mapping": { "<type>": "#/$defs/<Name>" } } } }
///   },
///   "$defs": { "<Name>": { "properties": { ... } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    root: Value,
}

impl SchemaDocument {
    /// Wraps a parsed schema document.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parses a schema document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> WorkflowResult<Self> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }

    /// Returns the raw document.
    #[inline]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Returns the root-level `$defs` entry with the given name.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.root.get(DEFS)?.get(name)
    }

    fn category_mapping(&self, category: NodeCategory) -> Option<&serde_json::Map<String, Value>> {
        self.root
            .get("properties")?
            .get(category.as_ref())?
            .get("items")?
            .get("discriminator")?
            .get("mapping")?
            .as_object()
    }

    /// Locates the definition describing the configurable fields of a node type.
    ///
    /// Returns `None` when the category has no mapping for the type or the
    /// mapped definition is missing; callers fall back to a hand-built layout.
    pub fn find_schema_for_type(&self, node_type: NodeType, category: NodeCategory) -> Option<&Value> {
        let mapping = self.category_mapping(category)?;
        let reference = mapping.get(node_type.as_ref())?.as_str()?;
        let name = reference.rsplit('/').next().filter(|name| !name.is_empty())?;

        let schema = self.definition(name);
        if schema.is_none() {
            tracing::debug!(
                target: TRACING_TARGET,
                node_type = %node_type,
                category = %category,
                reference,
                "Mapped schema definition is missing"
            );
        }
        schema
    }

    /// Lists the node types the backend accepts as roots of a category.
    pub fn category_node_types(&self, category: NodeCategory) -> Vec<NodeType> {
        let Some(mapping) = self.category_mapping(category) else {
            return Vec::new();
        };

        let mut types = Vec::with_capacity(mapping.len());
        for key in mapping.keys() {
            match NodeType::from_module(key) {
                Some(node_type) if !types.contains(&node_type) => types.push(node_type),
                Some(_) => {}
                None => {
                    tracing::trace!(
                        target: TRACING_TARGET,
                        module = %key,
                        category = %category,
                        "Skipping unknown module in discriminator mapping"
                    );
                }
            }
        }
        types
    }

    /// Lists the node types a child attached to `slot` of a node may have.
    pub fn slot_options(&self, node_type: NodeType, category: NodeCategory, slot: &Slot) -> Vec<NodeType> {
        let Some(property) = self
            .find_schema_for_type(node_type, category)
            .and_then(|schema| schema.get("properties"))
            .and_then(|properties| properties.get(slot.config_key()))
        else {
            return Vec::new();
        };

        let mut types = Vec::new();
        for module in discriminator_options(property) {
            if let Some(node_type) = NodeType::from_module(&module)
                && !types.contains(&node_type)
            {
                types.push(node_type);
            }
        }
        types
    }
}

impl From<Value> for SchemaDocument {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> SchemaDocument {
        SchemaDocument::new(json!({
            "properties": {
                "preprocess": {
                    "type": "array",
                    "items": {
                        "discriminator": {
                            "propertyName": "module",
                            "mapping": {
                                "historical": "#/$defs/HistoricalAgent",
                                "pre_conditional": "#/$defs/PreConditionalAgent",
                                "missing": "#/$defs/Nowhere"
                            }
                        }
                    }
                },
                "context": {
                    "type": "array",
                    "items": {
                        "discriminator": {
                            "mapping": {
                                "brave": "#/$defs/BraveAgent",
                                "tavily": "#/$defs/TavilyAgent",
                                "sql": "#/$defs/SqlAgent"
                            }
                        }
                    }
                }
            },
            "$defs": {
                "HistoricalAgent": {
                    "title": "HistoricalAgent",
                    "properties": { "all": { "type": "boolean", "default": false } }
                },
                "PreConditionalAgent": {
                    "properties": {
                        "prompt": { "type": "string" },
                        "then": {
                            "title": "IF agents",
                            "type": "array",
                            "items": {
                                "discriminator": {
                                    "mapping": {
                                        "historical": "#/$defs/HistoricalAgent",
                                        "rephrase": "#/$defs/RephraseAgent"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn finds_schema_through_mapping() {
        let doc = document();
        let schema = doc
            .find_schema_for_type(NodeType::Historical, NodeCategory::Preprocess)
            .unwrap();
        assert_eq!(schema["title"], "HistoricalAgent");
    }

    #[test]
    fn missing_mapping_or_definition_is_absent() {
        let doc = document();
        assert!(doc.find_schema_for_type(NodeType::Rephrase, NodeCategory::Preprocess).is_none());
        assert!(doc.find_schema_for_type(NodeType::Remi, NodeCategory::Postprocess).is_none());
        assert!(doc.find_schema_for_type(NodeType::Sql, NodeCategory::Context).is_none());
    }

    #[test]
    fn lists_category_types_with_internet_collapsed() {
        let doc = document();
        assert_eq!(
            doc.category_node_types(NodeCategory::Context),
            vec![NodeType::Internet, NodeType::Sql]
        );
        assert_eq!(
            doc.category_node_types(NodeCategory::Preprocess),
            vec![NodeType::Historical, NodeType::PreConditional]
        );
        assert!(doc.category_node_types(NodeCategory::Generation).is_empty());
    }

    #[test]
    fn lists_slot_options_from_discriminator() {
        let doc = document();
        let options = doc.slot_options(NodeType::PreConditional, NodeCategory::Preprocess, &Slot::Then);
        assert_eq!(options, vec![NodeType::Historical, NodeType::Rephrase]);
        assert!(
            doc.slot_options(NodeType::PreConditional, NodeCategory::Preprocess, &Slot::Else)
                .is_empty()
        );
    }
}
