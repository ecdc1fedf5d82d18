//! JSON Schema sanitizer for Gemini function declarations
//!
//! Gemini accepts only a subset of JSON Schema: local `$ref` pointers are
//! inlined and the keywords it rejects are removed at every depth.

use serde_json::{Map, Value};

use crate::error::LlmError;

const STRIPPED_KEYS: [&str; 6] = ["$schema", "$ref", "ref", "additionalProperties", "definitions", "$defs"];

/// Inline `#/definitions/*` and `#/$defs/*` references and strip unsupported keywords
///
/// A reference that is reached again while it is still being expanded is a
/// cycle and fails with [`LlmError::Schema`]. Unresolvable references are
/// dropped. Cleaning an already clean schema returns it unchanged.
pub fn clean_schema(schema: &Value) -> Result<Value, LlmError> {
    let definitions = collect_definitions(schema);
    let mut expanding = Vec::new();
    clean_node(schema, &definitions, &mut expanding)
}

fn collect_definitions(schema: &Value) -> Map<String, Value> {
    let mut definitions = Map::new();
    for (keyword, prefix) in [("definitions", "#/definitions/"), ("$defs", "#/$defs/")] {
        if let Some(defs) = schema.get(keyword).and_then(Value::as_object) {
            for (name, def) in defs {
                definitions.insert(format!("{prefix}{name}"), def.clone());
            }
        }
    }
    definitions
}

fn clean_node(node: &Value, definitions: &Map<String, Value>, expanding: &mut Vec<String>) -> Result<Value, LlmError> {
    match node {
        Value::Array(items) => items
            .iter()
            .map(|item| clean_node(item, definitions, expanding))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str)
                && let Some(Value::Object(target)) = definitions.get(reference)
            {
                if expanding.iter().any(|seen| seen == reference) {
                    return Err(LlmError::Schema(format!("recursive reference `{reference}`")));
                }

                // sibling keywords on the referencing node win over the target
                let mut merged = target.clone();
                for (key, value) in map.iter().filter(|(key, _)| key.as_str() != "$ref") {
                    merged.insert(key.clone(), value.clone());
                }

                expanding.push(reference.to_owned());
                let cleaned = clean_node(&Value::Object(merged), definitions, expanding);
                expanding.pop();
                return cleaned;
            }

            let mut cleaned = Map::with_capacity(map.len());
            for (key, value) in map {
                if STRIPPED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                cleaned.insert(key.clone(), clean_node(value, definitions, expanding)?);
            }
            Ok(Value::Object(cleaned))
        }
        scalar => Ok(scalar.clone()),
    }
}
