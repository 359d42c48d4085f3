//! Declarative record shapes and their runtime checks.
//!
//! Every request and response record has a compile-time Rust type plus a
//! [`Shape`] describing its JSON form. The shape is checked whenever data
//! crosses a boundary: inbound HTTP bodies and raw model output. It also
//! doubles as the structured-output schema sent to the model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A required string field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// One offending field, reported with its JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// An object shape: a name plus required string fields.
#[derive(Debug)]
pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Shape {
    /// Check `value` against the shape, collecting every issue.
    ///
    /// Unknown fields are ignored.
    pub fn check(&self, value: &Value) -> Result<(), Vec<FieldIssue>> {
        let Some(object) = value.as_object() else {
            return Err(vec![FieldIssue::new(
                "",
                format!("Expected object, received {}", type_name(value)),
            )]);
        };

        let issues: Vec<FieldIssue> = self
            .fields
            .iter()
            .filter_map(|field| match object.get(field.name) {
                None | Some(Value::Null) => Some(FieldIssue::new(field.name, "Required")),
                Some(v) if !v.is_string() => Some(FieldIssue::new(
                    field.name,
                    format!("Expected string, received {}", type_name(v)),
                )),
                Some(_) => None,
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Check then deserialize into the typed record.
    pub fn parse<T: DeserializeOwned>(&self, value: &Value) -> Result<T, Vec<FieldIssue>> {
        self.check(value)?;
        serde_json::from_value(value.clone())
            .map_err(|e| vec![FieldIssue::new("", e.to_string())])
    }

    /// Render as the `responseSchema` object understood by Gemini.
    pub fn to_response_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| {
                (
                    field.name.to_string(),
                    json!({
                        "type": "STRING",
                        "description": field.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self.fields.iter().map(|f| f.name).collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }
}

/// A record with a declared shape.
pub trait Schema {
    fn shape() -> &'static Shape;
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
