//! Field classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use super::{ANY_OF, REF, SchemaDocument, has_discriminator};

/// Custom editor requested by a schema `widget` attribute or a key override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    #[strum(to_string = "model_select", serialize = "llm_select")]
    ModelSelect,
    DriverSelect,
    FilteredSourceSelect,
    ApiHeadersField,
    CodeEditor,
    ExpandableTextarea,
    TransportField,
    RulesField,
    KeyValueField,
    ArrayStringField,
    EnumSelect,
    SynonymsField,
    Placeholder,
    NotShow,
}

/// Editor kind chosen for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "widget", rename_all = "snake_case")]
pub enum FieldKind {
    /// Dedicated editor.
    Custom(Widget),
    /// Read-only constant.
    Const,
    /// Selection among enumerated values.
    Enum,
    /// Nested form.
    Subform,
    /// Free text.
    Text,
    /// Toggle.
    Boolean,
    /// Integer or floating point input.
    Number,
    /// List of values.
    Array,
}

/// Classification of a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Editor kind.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Driver provider for driver selects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Whether several values may be selected.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiselect: bool,
}

impl FieldConfig {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            provider: None,
            multiselect: false,
        }
    }

    fn custom(widget: Widget) -> Self {
        Self::of(FieldKind::Custom(widget))
    }

    fn driver(provider: &str) -> Self {
        Self {
            kind: FieldKind::Custom(Widget::DriverSelect),
            provider: Some(provider.to_owned()),
            multiselect: false,
        }
    }
}

const IGNORED_KEYS: [&str; 6] = ["type", "id", "module", "title", "fallback", "next_agent"];

const MODEL_KEYS: [&str; 7] = [
    "conversion_model",
    "generative_model",
    "model",
    "rephrase_model",
    "sampling_model",
    "summarize_model",
    "tool_choice_model",
];

fn widget_config(widget: &str) -> Option<FieldConfig> {
    let widget: Widget = widget.parse().ok()?;
    let config = match widget {
        Widget::ArrayStringField => FieldConfig::of(FieldKind::Array),
        Widget::EnumSelect => FieldConfig::of(FieldKind::Enum),
        Widget::NotShow | Widget::Placeholder => return None,
        other => FieldConfig::custom(other),
    };
    Some(config)
}

fn key_override(key: &str) -> Option<FieldConfig> {
    let config = match key {
        "rules" => FieldConfig::custom(Widget::RulesField),
        "transport" => FieldConfig::custom(Widget::TransportField),
        "roots" | "parameters" => FieldConfig::custom(Widget::KeyValueField),
        "labels" | "rids" | "detection_config" => FieldConfig::custom(Widget::Placeholder),
        "source" => FieldConfig::custom(Widget::FilteredSourceSelect),
        "cypher" => FieldConfig::driver("cypher"),
        "kb" => FieldConfig::driver("nucliadb"),
        "provider" => FieldConfig::driver("alinia"),
        "sources" => FieldConfig {
            multiselect: true,
            ..FieldConfig::driver("nucliadb")
        },
        "code" => FieldConfig::custom(Widget::CodeEditor),
        "prompt" => FieldConfig::custom(Widget::ExpandableTextarea),
        "provided_synonyms" => FieldConfig::custom(Widget::SynonymsField),
        key if MODEL_KEYS.contains(&key) => FieldConfig::custom(Widget::ModelSelect),
        _ => return None,
    };
    Some(config)
}

fn key_title_override(key: &str, title: &str) -> Option<FieldConfig> {
    let lookup = format!("{}-{}", key.to_lowercase(), title.to_lowercase());
    match lookup.as_str() {
        "source-source" => Some(FieldConfig::driver("alinia")),
        _ => None,
    }
}

fn first_type(value: &Value) -> Option<&str> {
    match value.get("type")? {
        Value::String(kind) => Some(kind),
        Value::Array(kinds) => kinds.first()?.as_str(),
        _ => None,
    }
}

fn kind_from_type(kind: &str) -> FieldKind {
    match kind {
        "boolean" => FieldKind::Boolean,
        "integer" | "number" => FieldKind::Number,
        "array" => FieldKind::Array,
        "object" => FieldKind::Subform,
        _ => FieldKind::Text,
    }
}

/// Classifies a resolved reference target.
fn kind_from_definition(definition: Option<&Value>) -> FieldKind {
    let Some(definition) = definition else {
        return FieldKind::Subform;
    };
    if definition.get("enum").is_some() {
        return FieldKind::Enum;
    }
    match first_type(definition) {
        Some(kind) if definition.get("properties").is_none() => kind_from_type(kind),
        _ => FieldKind::Subform,
    }
}

/// Chooses the editor for the property `key` of a node schema.
///
/// Precedence: `widget` attribute, per-key override, per-(key, title)
/// override, `const`, `enum`, `$ref`, declared `type`, `anyOf`, then text.
pub fn classify_field(doc: &SchemaDocument, key: &str, property: &Value, scope: &Value) -> FieldConfig {
    if let Some(config) = property
        .get("widget")
        .and_then(Value::as_str)
        .and_then(widget_config)
    {
        return config;
    }

    if let Some(config) = key_override(key) {
        return config;
    }

    let title = property.get("title").and_then(Value::as_str).unwrap_or_default();
    if let Some(config) = key_title_override(key, title) {
        return config;
    }

    if property.get("const").is_some() {
        return FieldConfig::of(FieldKind::Const);
    }
    if property.get("enum").is_some() {
        return FieldConfig::of(FieldKind::Enum);
    }

    if let Some(reference) = property.get(REF).and_then(Value::as_str) {
        return FieldConfig::of(kind_from_definition(doc.lookup_reference(reference, scope)));
    }

    if let Some(kind) = first_type(property) {
        return FieldConfig::of(kind_from_type(kind));
    }

    if let Some(members) = property.get(ANY_OF).and_then(Value::as_array) {
        if let Some(reference) = members
            .iter()
            .find_map(|member| member.get(REF).and_then(Value::as_str))
        {
            let kind = match doc.lookup_reference(reference, scope) {
                Some(definition) if definition.get("enum").is_some() => FieldKind::Enum,
                _ => FieldKind::Subform,
            };
            return FieldConfig::of(kind);
        }

        let array_of_refs = members.iter().any(|member| {
            first_type(member) == Some("array")
                && member.get("items").and_then(|items| items.get(REF)).is_some()
        });
        if array_of_refs {
            return FieldConfig::of(FieldKind::Array);
        }

        if let Some(kind) = members
            .iter()
            .filter_map(first_type)
            .find(|kind| *kind != "null")
        {
            return FieldConfig::of(kind_from_type(kind));
        }
    }

    FieldConfig::of(FieldKind::Text)
}

/// Returns `true` for properties that never appear in a generated form.
///
/// Hidden widgets, structural keys and pointers to child agents are
/// edited through the graph, not the form.
pub fn is_field_ignored(key: &str, property: &Value) -> bool {
    if property.get("widget").and_then(Value::as_str) == Some(Widget::NotShow.as_ref()) {
        return true;
    }
    if IGNORED_KEYS.contains(&key) {
        return true;
    }

    let title = property.get("title").and_then(Value::as_str).unwrap_or_default();
    if title.contains("IF agents") || title.contains("Else agents") {
        return true;
    }

    property
        .get("items")
        .is_some_and(|items| items.get("discriminator").is_some() || has_discriminator(items))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> SchemaDocument {
        SchemaDocument::new(json!({
            "$defs": {
                "Mode": { "type": "string", "enum": ["fast", "slow"] },
                "Retries": { "type": "integer" },
                "Header": { "type": "object", "properties": { "name": { "type": "string" } } }
            }
        }))
    }

    fn kind(key: &str, property: Value) -> FieldKind {
        let doc = document();
        classify_field(&doc, key, &property, doc.root()).kind
    }

    #[test]
    fn widget_attribute_wins() {
        assert_eq!(
            kind("prompt", json!({ "type": "string", "widget": "code_editor" })),
            FieldKind::Custom(Widget::CodeEditor)
        );
        assert_eq!(
            kind("x", json!({ "widget": "llm_select" })),
            FieldKind::Custom(Widget::ModelSelect)
        );
        assert_eq!(kind("x", json!({ "widget": "enum_select" })), FieldKind::Enum);
    }

    #[test]
    fn key_overrides_come_before_schema_shape() {
        assert_eq!(
            kind("rules", json!({ "type": "array" })),
            FieldKind::Custom(Widget::RulesField)
        );
        assert_eq!(
            kind("summarize_model", json!({ "type": "string" })),
            FieldKind::Custom(Widget::ModelSelect)
        );

        let doc = document();
        let sources = classify_field(&doc, "sources", &json!({ "type": "array" }), doc.root());
        assert_eq!(sources.provider.as_deref(), Some("nucliadb"));
        assert!(sources.multiselect);
    }

    #[test]
    fn source_title_override() {
        let doc = document();
        let config = classify_field(&doc, "Source", &json!({ "title": "Source" }), doc.root());
        assert_eq!(config.kind, FieldKind::Custom(Widget::DriverSelect));
        assert_eq!(config.provider.as_deref(), Some("alinia"));
    }

    #[test]
    fn const_then_enum_then_reference() {
        assert_eq!(kind("x", json!({ "const": "a", "enum": ["a"] })), FieldKind::Const);
        assert_eq!(kind("x", json!({ "enum": ["a"], "type": "string" })), FieldKind::Enum);
        assert_eq!(kind("x", json!({ "$ref": "#/$defs/Mode" })), FieldKind::Enum);
        assert_eq!(kind("x", json!({ "$ref": "#/$defs/Retries" })), FieldKind::Number);
        assert_eq!(kind("x", json!({ "$ref": "#/$defs/Header" })), FieldKind::Subform);
        assert_eq!(kind("x", json!({ "$ref": "#/$defs/Missing" })), FieldKind::Subform);
    }

    #[test]
    fn declared_type_then_any_of() {
        assert_eq!(kind("x", json!({ "type": "boolean" })), FieldKind::Boolean);
        assert_eq!(kind("x", json!({ "type": ["integer", "null"] })), FieldKind::Number);
        assert_eq!(
            kind("x", json!({ "anyOf": [{ "type": "null" }, { "$ref": "#/$defs/Mode" }] })),
            FieldKind::Enum
        );
        assert_eq!(
            kind("x", json!({ "anyOf": [{ "type": "array", "items": { "$ref": "#/$defs/Header" } }] })),
            FieldKind::Array
        );
        assert_eq!(
            kind("x", json!({ "anyOf": [{ "type": "null" }, { "type": "boolean" }] })),
            FieldKind::Boolean
        );
        assert_eq!(kind("x", json!({})), FieldKind::Text);
    }

    #[test]
    fn structural_fields_are_ignored() {
        assert!(is_field_ignored("module", &json!({ "type": "string" })));
        assert!(is_field_ignored("next_agent", &json!({})));
        assert!(is_field_ignored("x", &json!({ "widget": "not_show" })));
        assert!(is_field_ignored("then", &json!({ "title": "IF agents" })));
        assert!(is_field_ignored(
            "agents",
            &json!({ "items": { "discriminator": { "mapping": {} } } })
        ));
        assert!(!is_field_ignored("prompt", &json!({ "type": "string" })));
    }
}
