//! Form generation from node schemas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FieldConfig, FieldKind, SchemaDocument, TRACING_TARGET, classify_field, is_field_ignored};
use crate::node::{NodeCategory, NodeType};

/// Nesting depth up to which subform fields are expanded.
const MAX_SUBFORM_DEPTH: usize = 4;

/// A single editable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Property key in the configuration object.
    pub key: String,
    /// Display title, defaulting to the key.
    pub title: String,
    /// Editor selection.
    pub config: FieldConfig,
    /// Resolved property schema.
    pub schema: Value,
    /// Whether the parent schema lists the key as required.
    pub required: bool,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Nested fields of a subform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FormField>,
}

/// Generated form for one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeForm {
    /// Node type the form edits.
    pub node_type: NodeType,
    /// Form title.
    pub title: String,
    /// Editable fields in declaration order.
    pub fields: Vec<FormField>,
}

impl NodeForm {
    /// Returns the initial configuration implied by the schema defaults.
    pub fn defaults(&self) -> Map<String, Value> {
        collect_defaults(&self.fields)
    }

    /// Returns the field with the given key.
    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key == key)
    }
}

fn collect_defaults(fields: &[FormField]) -> Map<String, Value> {
    let mut defaults = Map::new();
    for field in fields {
        if let Some(default) = &field.default {
            defaults.insert(field.key.clone(), default.clone());
        } else if !field.fields.is_empty() {
            let nested = collect_defaults(&field.fields);
            if !nested.is_empty() {
                defaults.insert(field.key.clone(), Value::Object(nested));
            }
        }
    }
    defaults
}

/// Produces the configuration form of a node type.
pub trait FormBuilder: Send + Sync {
    /// Builds the form, or returns `None` when no form can be generated
    /// and a hand-built layout must be used.
    fn build(&self, doc: &SchemaDocument, node_type: NodeType, category: NodeCategory) -> Option<NodeForm>;
}

/// Builds forms from the discriminator-mapped schema definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaFormBuilder;

impl SchemaFormBuilder {
    fn fields(doc: &SchemaDocument, schema: &Value, scope: &Value, depth: usize) -> Vec<FormField> {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(properties.len());
        for (key, property) in properties {
            if is_field_ignored(key, property) {
                continue;
            }

            let config = classify_field(doc, key, property, scope);
            let resolved = doc.resolve_property(property, scope);
            let nested = if config.kind == FieldKind::Subform && depth < MAX_SUBFORM_DEPTH {
                Self::fields(doc, &resolved, scope, depth + 1)
            } else {
                Vec::new()
            };

            fields.push(FormField {
                key: key.clone(),
                title: resolved
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_owned(),
                config,
                default: resolved.get("default").cloned(),
                required: required.contains(&key.as_str()),
                schema: resolved,
                fields: nested,
            });
        }
        fields
    }
}

impl FormBuilder for SchemaFormBuilder {
    fn build(&self, doc: &SchemaDocument, node_type: NodeType, category: NodeCategory) -> Option<NodeForm> {
        let schema = doc.find_schema_for_type(node_type, category)?;
        let fields = Self::fields(doc, schema, schema, 0);

        tracing::trace!(
            target: TRACING_TARGET,
            node_type = %node_type,
            category = %category,
            field_count = fields.len(),
            "Built node form"
        );

        Some(NodeForm {
            node_type,
            title: schema
                .get("title")
                .and_then(Value::as_str)
                .map_or_else(|| node_type.to_string(), str::to_owned),
            fields,
        })
    }
}
