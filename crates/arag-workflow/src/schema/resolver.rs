//! `$ref` and `anyOf` resolution.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use super::{ANY_OF, DEFS, ONE_OF, REF, SchemaDocument, TRACING_TARGET};

/// Maximum number of alias hops followed when resolving a reference.
pub const MAX_RESOLUTION_DEPTH: usize = 16;

/// Extracts the definition name from a `#/$defs/<Name>` reference.
///
/// Deeper JSON pointers are not supported and yield `None`.
pub fn definition_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix("#/$defs/")
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn reference_of(value: &Value) -> Option<&str> {
    value.get(REF)?.as_str()
}

fn is_null_type(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("null")
}

/// Returns the target of a definition that only aliases another one.
fn alias_target(definition: &Value) -> Option<&str> {
    let object = definition.as_object()?;
    if object.len() == 1 { reference_of(definition) } else { None }
}

/// Returns the first `anyOf` member carrying a reference that is not the null type.
fn any_of_reference_member(property: &Value) -> Option<&Value> {
    property
        .get(ANY_OF)?
        .as_array()?
        .iter()
        .find(|member| reference_of(member).is_some() && !is_null_type(member))
}

/// Shallow-merges `overrides` over `base`, skipping the listed keys.
fn overlay(base: Value, overrides: &Map<String, Value>, skip: &[&str]) -> Value {
    let mut merged = match base {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    for (key, value) in overrides {
        if !skip.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

impl SchemaDocument {
    fn find_definition<'a>(&'a self, name: &str, scope: &'a Value) -> Option<&'a Value> {
        scope
            .get(DEFS)
            .and_then(|defs| defs.get(name))
            .or_else(|| self.definition(name))
    }

    /// Looks up the definition a reference points to, following pure aliases.
    ///
    /// Cycles and chains longer than [`MAX_RESOLUTION_DEPTH`] are treated as
    /// unresolvable.
    pub fn lookup_reference<'a>(&'a self, reference: &'a str, scope: &'a Value) -> Option<&'a Value> {
        let mut visited = HashSet::new();
        let mut current = reference;

        for _ in 0..MAX_RESOLUTION_DEPTH {
            let name = definition_name(current)?;
            if !visited.insert(name) {
                tracing::warn!(
                    target: TRACING_TARGET,
                    reference,
                    name,
                    "Cyclic schema reference"
                );
                return None;
            }

            let definition = self.find_definition(name, scope)?;
            match alias_target(definition) {
                Some(next) => current = next,
                None => return Some(definition),
            }
        }

        tracing::warn!(
            target: TRACING_TARGET,
            reference,
            max_depth = MAX_RESOLUTION_DEPTH,
            "Schema reference chain too deep"
        );
        None
    }

    fn resolve_reference(&self, reference: &str, scope: &Value) -> Value {
        match self.lookup_reference(reference, scope) {
            Some(definition) => definition.clone(),
            None => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    reference,
                    "Unresolvable schema reference, using empty object schema"
                );
                empty_object_schema()
            }
        }
    }

    /// Resolves one property of `scope` into a concrete schema.
    ///
    /// A direct `$ref` is replaced by its definition with the property's own
    /// keys merged over it. An `anyOf` is reduced to its first non-null member
    /// carrying a reference, or else its first non-null member, again with
    /// the outer keys merged over it. Only one reference hop is taken.
    pub fn resolve_property(&self, property: &Value, scope: &Value) -> Value {
        let Some(object) = property.as_object() else {
            return property.clone();
        };

        if let Some(reference) = reference_of(property) {
            let base = self.resolve_reference(reference, scope);
            return overlay(base, object, &[REF]);
        }

        if let Some(members) = object.get(ANY_OF).and_then(Value::as_array) {
            let chosen = match any_of_reference_member(property) {
                Some(member) => {
                    let reference = reference_of(member).unwrap_or_default();
                    let base = self.resolve_reference(reference, scope);
                    member
                        .as_object()
                        .map(|member| overlay(base.clone(), member, &[REF]))
                        .unwrap_or(base)
                }
                None => match members.iter().find(|member| !is_null_type(member)) {
                    Some(member) => member.clone(),
                    None => Value::Object(Map::new()),
                },
            };
            return overlay(chosen, object, &[ANY_OF]);
        }

        property.clone()
    }

    /// Returns `true` if the property should be edited as a nested form.
    ///
    /// References resolving to an enum or to a non-object scalar are not
    /// subforms; unresolvable references degrade to empty subforms.
    pub fn is_subform_field(&self, property: &Value, scope: &Value) -> bool {
        let reference = reference_of(property)
            .or_else(|| any_of_reference_member(property).and_then(reference_of));

        match reference {
            Some(reference) => match self.lookup_reference(reference, scope) {
                Some(definition) => is_object_schema(definition),
                None => true,
            },
            None => {
                property.get("type").and_then(Value::as_str) == Some("object")
                    || property.get("properties").is_some()
            }
        }
    }
}

fn is_object_schema(definition: &Value) -> bool {
    if definition.get("enum").is_some() {
        return false;
    }
    match definition.get("type").and_then(Value::as_str) {
        Some(kind) => kind == "object",
        None => true,
    }
}

/// Collects every `discriminator.mapping` reachable from a property.
///
/// Looks at the property itself, its `anyOf`/`oneOf` members and, for
/// arrays, the item schema and its `anyOf`/`oneOf` members.
fn discriminator_mappings(property: &Value) -> Vec<&Map<String, Value>> {
    fn direct(value: &Value) -> Option<&Map<String, Value>> {
        value.get("discriminator")?.get("mapping")?.as_object()
    }

    fn collect<'a>(value: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
        out.extend(direct(value));
        for union in [ANY_OF, ONE_OF] {
            if let Some(members) = value.get(union).and_then(Value::as_array) {
                out.extend(members.iter().filter_map(direct));
            }
        }
    }

    let mut mappings = Vec::new();
    collect(property, &mut mappings);
    if let Some(items) = property.get("items") {
        collect(items, &mut mappings);
    }
    mappings
}

/// Returns `true` if the property (or its array items) declares a discriminator mapping.
pub fn has_discriminator(property: &Value) -> bool {
    !discriminator_mappings(property).is_empty()
}

/// Returns the discriminator tags accepted by a property, in first-seen order.
pub fn discriminator_options(property: &Value) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for mapping in discriminator_mappings(property) {
        for key in mapping.keys() {
            if !options.contains(key) {
                options.push(key.clone());
            }
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> SchemaDocument {
        SchemaDocument::new(json!({
            "$defs": {
                "Foo": { "type": "integer", "default": 1 },
                "Color": { "type": "string", "enum": ["red", "blue"] },
                "Nested": {
                    "type": "object",
                    "title": "Nested",
                    "properties": { "depth": { "type": "integer" } }
                },
                "Alias": { "$ref": "#/$defs/Nested" },
                "LoopA": { "$ref": "#/$defs/LoopB" },
                "LoopB": { "$ref": "#/$defs/LoopA" }
            }
        }))
    }

    #[test]
    fn caller_attributes_win_over_definition() {
        let doc = document();
        let property = json!({ "$ref": "#/$defs/Foo", "default": 5 });
        let resolved = doc.resolve_property(&property, doc.root());
        assert_eq!(resolved, json!({ "type": "integer", "default": 5 }));
    }

    #[test]
    fn unresolvable_reference_is_empty_object() {
        let doc = document();
        let property = json!({ "$ref": "#/$defs/Missing", "title": "Missing" });
        let resolved = doc.resolve_property(&property, doc.root());
        assert_eq!(
            resolved,
            json!({ "type": "object", "properties": {}, "title": "Missing" })
        );
        assert!(doc.is_subform_field(&property, doc.root()));
    }

    #[test]
    fn any_of_prefers_reference_member() {
        let doc = document();
        let property = json!({
            "anyOf": [{ "type": "null" }, { "type": "string" }, { "$ref": "#/$defs/Nested" }],
            "default": null
        });
        let resolved = doc.resolve_property(&property, doc.root());
        assert_eq!(resolved["title"], "Nested");
        assert_eq!(resolved["default"], Value::Null);
        assert!(resolved.get(ANY_OF).is_none());
    }

    #[test]
    fn any_of_without_reference_takes_first_non_null() {
        let doc = document();
        let property = json!({
            "anyOf": [{ "type": "null" }, { "type": "string", "maxLength": 3 }],
            "title": "Name"
        });
        let resolved = doc.resolve_property(&property, doc.root());
        assert_eq!(
            resolved,
            json!({ "type": "string", "maxLength": 3, "title": "Name" })
        );
    }

    #[test]
    fn aliases_are_followed_and_cycles_stop() {
        let doc = document();
        let resolved = doc.resolve_property(&json!({ "$ref": "#/$defs/Alias" }), doc.root());
        assert_eq!(resolved["title"], "Nested");

        let looped = doc.resolve_property(&json!({ "$ref": "#/$defs/LoopA" }), doc.root());
        assert_eq!(looped, json!({ "type": "object", "properties": {} }));
    }

    #[test]
    fn scope_definitions_shadow_root_definitions() {
        let doc = document();
        let scope = json!({ "$defs": { "Foo": { "type": "string" } } });
        let resolved = doc.resolve_property(&json!({ "$ref": "#/$defs/Foo" }), &scope);
        assert_eq!(resolved, json!({ "type": "string" }));
    }

    #[test]
    fn enum_and_scalar_references_are_not_subforms() {
        let doc = document();
        let root = doc.root();
        assert!(!doc.is_subform_field(&json!({ "$ref": "#/$defs/Color" }), root));
        assert!(!doc.is_subform_field(&json!({ "$ref": "#/$defs/Foo" }), root));
        assert!(doc.is_subform_field(&json!({ "$ref": "#/$defs/Nested" }), root));
        assert!(doc.is_subform_field(
            &json!({ "anyOf": [{ "$ref": "#/$defs/Nested" }, { "type": "null" }] }),
            root
        ));
        assert!(!doc.is_subform_field(&json!({ "type": "string" }), root));
    }

    #[test]
    fn discriminators_are_found_in_unions_and_items() {
        let direct = json!({ "discriminator": { "mapping": { "ask": "#/$defs/Ask" } } });
        let in_items = json!({
            "type": "array",
            "items": { "oneOf": [{ "discriminator": { "mapping": { "sql": "#/$defs/Sql" } } }] }
        });
        let in_any_of = json!({
            "anyOf": [
                { "discriminator": { "mapping": { "remi": "#/$defs/Remi" } } },
                { "type": "null" }
            ]
        });

        assert!(has_discriminator(&direct));
        assert!(has_discriminator(&in_items));
        assert!(has_discriminator(&in_any_of));
        assert!(!has_discriminator(&json!({ "type": "array", "items": { "type": "string" } })));
        assert_eq!(discriminator_options(&in_items), vec!["sql".to_owned()]);
    }

    #[test]
    fn only_defs_references_are_supported() {
        assert_eq!(definition_name("#/$defs/Foo"), Some("Foo"));
        assert_eq!(definition_name("#/definitions/Foo"), None);
        assert_eq!(definition_name("#/$defs/Foo/properties/bar"), None);
    }
}
