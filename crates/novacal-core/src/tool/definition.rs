//! Tool definition helpers

use serde_json::{json, Map, Value as JsonValue};

pub use crate::llm::ToolDefinition;

/// Builder for flat JSON object schemas
///
/// ```ignore
/// let schema = SchemaBuilder::new()
///     .required_string("keyword", "Word to search for in event titles")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    properties: Map<String, JsonValue>,
    required: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, type_str: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": type_str, "description": description}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn required_string(self, name: &str, description: &str) -> Self {
        self.property(name, "string", description, true)
    }

    pub fn optional_string(self, name: &str, description: &str) -> Self {
        self.property(name, "string", description, false)
    }

    pub fn optional_boolean(self, name: &str, description: &str) -> Self {
        self.property(name, "boolean", description, false)
    }

    pub fn build(self) -> JsonValue {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required
        })
    }
}
